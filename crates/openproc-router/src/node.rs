//! Radix tree node implementation.
//!
//! Each node owns one template segment. Children are split by kind so that
//! matching can try them in priority order: literal, then parameter, then
//! catch-all. Parameter names are not part of the tree; they live on the
//! [`RouteEntry`](crate::RouteEntry) so that two methods on the same path
//! may name their parameters differently.

use crate::method_router::MethodRouter;
use crate::template::Segment;

/// Kind of segment a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal path segment (e.g., "users").
    Static,
    /// Single-segment parameter.
    Param,
    /// Trailing catch-all.
    CatchAll,
}

/// A node in the radix tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// Literal text for static nodes, empty otherwise.
    pub segment: String,

    /// The kind of segment.
    pub kind: SegmentKind,

    /// Routes terminating at this node.
    pub methods: MethodRouter,

    /// Static children, sorted by segment for binary search.
    pub static_children: Vec<Node>,

    /// Parameter child (at most one per node).
    pub param_child: Option<Box<Node>>,

    /// Catch-all child (at most one per node, always a leaf).
    pub catch_all_child: Option<Box<Node>>,
}

impl Node {
    fn new(segment: impl Into<String>, kind: SegmentKind) -> Self {
        Self {
            segment: segment.into(),
            kind,
            methods: MethodRouter::new(),
            static_children: Vec::new(),
            param_child: None,
            catch_all_child: None,
        }
    }

    /// Creates a root node for the tree.
    #[must_use]
    pub fn root() -> Self {
        Self::new("", SegmentKind::Static)
    }

    /// Walks (creating as needed) the node for a compiled template and
    /// returns it.
    pub fn node_for(&mut self, segments: &[Segment]) -> &mut Node {
        let Some((first, rest)) = segments.split_first() else {
            return self;
        };

        let child = match first {
            Segment::Literal(lit) => {
                let index = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(lit))
                {
                    Ok(i) => i,
                    Err(i) => {
                        self.static_children
                            .insert(i, Node::new(lit.as_str(), SegmentKind::Static));
                        i
                    }
                };
                &mut self.static_children[index]
            }
            Segment::Param(_) => self
                .param_child
                .get_or_insert_with(|| Box::new(Node::new("", SegmentKind::Param))),
            Segment::CatchAll(_) => self
                .catch_all_child
                .get_or_insert_with(|| Box::new(Node::new("", SegmentKind::CatchAll))),
        };

        child.node_for(rest)
    }

    /// Matches decoded path segments against the tree.
    ///
    /// `accept` decides whether a terminal node is usable, which lets the
    /// caller keep searching when a better-ranked path exists only for other
    /// methods. Captured values are pushed to `captures` in template order and
    /// truncated again whenever a branch is abandoned.
    pub fn match_segments<'a, F>(
        &'a self,
        segments: &[String],
        captures: &mut Vec<String>,
        accept: &F,
    ) -> Option<&'a MethodRouter>
    where
        F: Fn(&MethodRouter) -> bool,
    {
        let Some((first, rest)) = segments.split_first() else {
            return accept(&self.methods).then_some(&self.methods);
        };

        if let Some(child) = self.find_static_child(first) {
            if let Some(found) = child.match_segments(rest, captures, accept) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            let mark = captures.len();
            captures.push(first.clone());
            if let Some(found) = child.match_segments(rest, captures, accept) {
                return Some(found);
            }
            captures.truncate(mark);
        }

        if let Some(child) = &self.catch_all_child {
            if accept(&child.methods) {
                captures.push(segments.join("/"));
                return Some(&child.methods);
            }
        }

        None
    }

    /// Finds a static child by segment using binary search.
    fn find_static_child(&self, segment: &str) -> Option<&Node> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}
