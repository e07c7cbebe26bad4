pub(crate) mod duration;
