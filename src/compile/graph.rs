use std::path::PathBuf;

use crate::effects::transitions::TransitionKind;
use crate::foundation::error::{SlideError, SlideResult};
use crate::foundation::math::fmt_secs;
use crate::timeline::planner::Timeline;

/// Per-input timebase normalization (`settb=AVTB`).
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TimebaseNode {
    /// Positional index of the compositor input feeding this node.
    pub input_index: usize,
    /// Output label, `img<ordinal>`.
    pub label: String,
}

/// Crossfade between the stream composed so far and the next image.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TransitionEdge {
    /// Label of the stream composed so far.
    pub from: String,
    /// Label of the incoming image stream.
    pub to: String,
    /// Label of the blended result.
    pub output: String,
    /// Transition style.
    #[serde(serialize_with = "serialize_kind")]
    pub kind: TransitionKind,
    /// Crossfade length in seconds.
    pub duration_secs: f64,
    /// Time at which the crossfade starts, relative to the composed stream.
    pub offset_secs: f64,
}

fn serialize_kind<S: serde::Serializer>(kind: &TransitionKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.xfade_name())
}

/// Linear composition chain: one node per segment, edges linking them in order.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FilterGraph {
    /// Timebase nodes in segment order.
    pub nodes: Vec<TimebaseNode>,
    /// Crossfades in chain order; empty for a single image.
    pub edges: Vec<TransitionEdge>,
    /// Label of the fully composed video stream.
    pub terminal: String,
}

impl FilterGraph {
    /// Render the graph as `-filter_complex` text.
    pub fn to_filter_complex(&self) -> String {
        let mut clauses: Vec<String> = Vec::with_capacity(self.nodes.len() + self.edges.len());
        for node in &self.nodes {
            clauses.push(format!("[{}]settb=AVTB[{}]", node.input_index, node.label));
        }
        for edge in &self.edges {
            clauses.push(format!(
                "[{}][{}]xfade=transition={}:duration={}:offset={}[{}]",
                edge.from,
                edge.to,
                edge.kind.xfade_name(),
                fmt_secs(edge.duration_secs),
                fmt_secs(edge.offset_secs),
                edge.output
            ));
        }
        clauses.join(";")
    }

    /// Return `true` when there is nothing to crossfade.
    pub fn is_single(&self) -> bool {
        self.edges.is_empty()
    }
}

/// One positional compositor input: a looped still shown for `duration_secs`.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct InputClause {
    /// Loop the single frame for the whole duration.
    pub loop_input: bool,
    /// Duration the input is read for.
    pub duration_secs: f64,
    /// Source image.
    pub path: PathBuf,
}

/// Compiler output consumed by the compositor.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CompiledGraph {
    /// The composition graph.
    pub graph: FilterGraph,
    /// Image inputs in positional order; index `i` feeds node `i`.
    pub inputs: Vec<InputClause>,
}

/// Compile a timeline into a timebase + crossfade chain.
///
/// Edge `k` (1-based) starts at the composed length of the first `k` segments minus the
/// `k` crossfades already consumed, so for uniform durations `d` the offsets are
/// `k * (d - crossfade)`.
pub fn compile_graph(
    timeline: &Timeline,
    kind: TransitionKind,
    crossfade_secs: f64,
) -> SlideResult<CompiledGraph> {
    if timeline.is_empty() {
        return Err(SlideError::graph_underflow("timeline has no segments"));
    }
    if !crossfade_secs.is_finite() || crossfade_secs <= 0.0 {
        return Err(SlideError::validation(
            "crossfade duration must be finite and > 0",
        ));
    }

    let nodes: Vec<TimebaseNode> = timeline
        .segments
        .iter()
        .enumerate()
        .map(|(i, seg)| TimebaseNode {
            input_index: i,
            label: seg.label(),
        })
        .collect();
    let inputs: Vec<InputClause> = timeline
        .segments
        .iter()
        .map(|seg| InputClause {
            loop_input: true,
            duration_secs: seg.duration_secs,
            path: seg.entry.path.clone(),
        })
        .collect();

    if timeline.len() == 1 {
        let terminal = nodes[0].label.clone();
        return Ok(CompiledGraph {
            graph: FilterGraph {
                nodes,
                edges: Vec::new(),
                terminal,
            },
            inputs,
        });
    }

    if let Some(seg) = timeline
        .segments
        .iter()
        .find(|s| s.duration_secs <= crossfade_secs)
    {
        return Err(SlideError::validation(format!(
            "segment {} lasts {}s, not longer than the {}s crossfade",
            seg.ordinal,
            fmt_secs(seg.duration_secs),
            fmt_secs(crossfade_secs)
        )));
    }

    let mut edges = Vec::with_capacity(timeline.len() - 1);
    let mut composed_secs = 0.0;
    for (k, pair) in timeline.segments.windows(2).enumerate() {
        let k1 = k + 1;
        composed_secs += pair[0].duration_secs;
        let from = match edges.last() {
            Some(TransitionEdge { output, .. }) => output.clone(),
            None => pair[0].label(),
        };
        edges.push(TransitionEdge {
            from,
            to: pair[1].label(),
            output: format!("filter{k1}"),
            kind,
            duration_secs: crossfade_secs,
            offset_secs: composed_secs - k1 as f64 * crossfade_secs,
        });
    }

    let terminal = edges
        .last()
        .map(|e| e.output.clone())
        .ok_or_else(|| SlideError::graph_underflow("crossfade chain is empty"))?;

    Ok(CompiledGraph {
        graph: FilterGraph {
            nodes,
            edges,
            terminal,
        },
        inputs,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/compile/graph.rs"]
mod tests;
