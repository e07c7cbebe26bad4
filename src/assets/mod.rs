pub(crate) mod loader;
pub(crate) mod manifest;
pub(crate) mod media;
