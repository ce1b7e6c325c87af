//! The rose tree engine.
//!
//! A [`Rose`] records how every sub-value of a generated value was produced:
//! one node per generation site, created lazily as generators pick sub-values.
//! Because each node remembers its atom and the generator that last ran
//! there, any single site can be re-generated, shrunk, and accepted without
//! replaying the rest of the tree and without the surface value losing
//! correlation with its internal choices.
//!
//! Shrinking proceeds in passes. Each pass walks the tree top-down and
//! installs at most one proposal; descendants are offered the chance first,
//! so values simplify innermost-first. A proposal that still reproduces the
//! failure is accepted, one that over-simplifies is rejected and the same
//! node offers its next candidate on the following pass.

use std::any::Any;
use std::fmt::Debug;
use std::io::{self, Write};

use log::{debug, trace};

use crate::gen::Gen;
use crate::random::{Atom, RandomSource};
use crate::shrink::BoxShrink;

/// Index of a node in the tree's arena.
///
/// Nodes live in a position-stable arena owned by the tree, so parent and
/// child links are indices and survive moves of the tree value; nodes
/// themselves are never copied or moved.
type NodeId = usize;

const ROOT: NodeId = 0;

/// Object-safe view of a [`Gen<T>`] stored in a node slot.
trait ErasedGenerator {
    fn produce_any(&self, rose: &mut Rose, id: NodeId) -> Box<dyn Any>;
    fn produce_string(&self, rose: &mut Rose, id: NodeId) -> String;
    fn clone_box(&self) -> Box<dyn ErasedGenerator>;
    fn name(&self) -> &str;
}

impl<T: Clone + Debug + 'static> ErasedGenerator for Gen<T> {
    fn produce_any(&self, rose: &mut Rose, id: NodeId) -> Box<dyn Any> {
        let mut ctx = Context { rose, current: id, next_child: 0 };
        Box::new(self.produce(&mut ctx))
    }

    fn produce_string(&self, rose: &mut Rose, id: NodeId) -> String {
        let mut ctx = Context { rose, current: id, next_child: 0 };
        format!("{:?}", self.produce(&mut ctx))
    }

    fn clone_box(&self) -> Box<dyn ErasedGenerator> {
        Box::new(self.clone())
    }

    fn name(&self) -> &str {
        Gen::name(self)
    }
}

/// One site in the generation tree.
struct RoseNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Drawn on first use, then fixed for the lifetime of the node.
    atom: Option<Atom>,
    /// The generator most recently supplied to `generate` at this node.
    last: Option<Box<dyn ErasedGenerator>>,
    /// The generator whose value the engine currently treats as canonical.
    accepted: Option<Box<dyn ErasedGenerator>>,
    /// A constant generator carrying a candidate under active trial.
    shrunk: Option<Box<dyn ErasedGenerator>>,
    /// Erased `BoxShrink<T>`; present only while a shrink round is in
    /// progress for this node.
    shrink_iter: Option<Box<dyn Any>>,
}

impl RoseNode {
    fn new(parent: Option<NodeId>) -> Self {
        RoseNode {
            parent,
            children: Vec::new(),
            atom: None,
            last: None,
            accepted: None,
            shrunk: None,
            shrink_iter: None,
        }
    }

    /// The first non-empty of {shrunk, accepted, last}.
    fn active_generator(&self) -> Option<&dyn ErasedGenerator> {
        self.shrunk
            .as_deref()
            .or(self.accepted.as_deref())
            .or(self.last.as_deref())
    }
}

/// Outcome of driving [`Rose::shrink`] to fixpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShrinkResult {
    /// Whether at least one shrink was accepted.
    pub success: bool,
    /// Total number of shrink passes, regardless of success.
    pub tries: usize,
}

/// A generation tree together with its per-case ambient state: the random
/// source, and, while a shrink pass runs, the node that has proposed a
/// candidate.
pub struct Rose {
    nodes: Vec<RoseNode>,
    source: RandomSource,
    /// Outer `Option`: whether a shrink pass is under way. Inner `Option`:
    /// the proposing node, if any.
    shrunk_node: Option<Option<NodeId>>,
}

/// Clears the shrunk-node binding when a shrink traversal exits, on every
/// path including unwinding out of a generator.
struct ShrunkScope<'a> {
    rose: &'a mut Rose,
}

impl Drop for ShrunkScope<'_> {
    fn drop(&mut self) {
        self.rose.shrunk_node = None;
    }
}

impl Rose {
    /// Construct a root node backed by the given random source.
    pub fn new(source: RandomSource) -> Self {
        Rose {
            nodes: vec![RoseNode::new(None)],
            source,
            shrunk_node: None,
        }
    }

    /// Construct a root node with a source seeded from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(RandomSource::new(seed))
    }

    /// Produce a value at the root using `gen`, recording `gen` as the
    /// root's most recent generator.
    pub fn generate<T>(&mut self, gen: &Gen<T>) -> T
    where
        T: Clone + Debug + 'static,
    {
        self.generate_at(ROOT, gen)
    }

    /// Drive shrinking to fixpoint against `predicate`, a generator that
    /// reproduces the property under test and returns whether it holds.
    ///
    /// Each pass walks the tree and installs at most one proposal. A pass on
    /// which the property still fails accepts the proposal; a pass on which
    /// it holds again rejects it, and the proposing node offers its next
    /// candidate on the following pass. A pass with no proposal ends the
    /// loop. Terminates whenever every shrink iterator involved is finite.
    pub fn shrink(&mut self, predicate: &Gen<bool>) -> ShrinkResult {
        let mut tries = 0;
        let mut success = false;
        let mut scope = ShrunkScope { rose: self };

        loop {
            tries += 1;
            scope.rose.shrunk_node = Some(None);
            let holds = scope.rose.generate(predicate);
            match scope.rose.shrunk_node.flatten() {
                None => break,
                Some(node) if !holds => {
                    trace!("pass {}: accepted shrink at {}", tries, scope.rose.path(node));
                    scope.rose.accept_shrink(node);
                    success = true;
                }
                Some(node) => {
                    trace!("pass {}: rejected candidate at {}", tries, scope.rose.path(node));
                }
            }
        }

        debug!("shrinking done: success={} after {} passes", success, tries);
        ShrinkResult { success, tries }
    }

    /// One string per immediate child of the root: a human-readable
    /// decomposition of the current value.
    pub fn example(&mut self) -> Vec<String> {
        let children = self.nodes[ROOT].children.clone();
        children.into_iter().map(|child| self.string_value(child)).collect()
    }

    /// Write an indented description of every node, one per line.
    pub fn print<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self.render())
    }

    /// Render the tree as an indented listing of generator names.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(ROOT, &mut out);
        out
    }

    fn generate_at<T>(&mut self, id: NodeId, gen: &Gen<T>) -> T
    where
        T: Clone + Debug + 'static,
    {
        self.nodes[id].last = Some(Box::new(gen.clone()));

        // A shrink pass is under way and no node has proposed yet on this
        // traversal.
        if self.shrunk_node == Some(None) {
            if self.nodes[id].shrink_iter.is_none() {
                let value = self.regenerate::<T>(id);
                // Descendants propose first.
                if self.shrunk_node != Some(None) {
                    return value;
                }
                self.nodes[id].shrink_iter = Some(Box::new(gen.shrink(value)));
                if self.nodes[id].accepted.is_none() {
                    // Fallback once shrinking at this node is exhausted.
                    self.nodes[id].accepted = Some(Box::new(gen.clone()));
                }
            }

            let iter = self.shrink_iter_mut::<T>(id);
            if iter.has_next() {
                let candidate = iter.next();
                self.nodes[id].shrunk = Some(Box::new(Gen::constant(candidate)));
                self.shrunk_node = Some(Some(id));
            } else {
                self.nodes[id].shrunk = None;
            }
        }

        self.regenerate::<T>(id)
    }

    /// Re-run the active generator at `id` in a fresh current-node scope.
    ///
    /// Children are revisited in pick order and cached atoms are reused, so
    /// sub-values that were already decided are preserved.
    fn regenerate<T>(&mut self, id: NodeId) -> T
    where
        T: Clone + Debug + 'static,
    {
        let generator = self
            .nodes[id]
            .active_generator()
            .expect("regenerate on a node that has never seen a generator")
            .clone_box();
        match generator.produce_any(self, id).downcast::<T>() {
            Ok(value) => *value,
            Err(_) => panic!(
                "generator at {} was replaced with one producing {} while state of a different type was live",
                self.path(id),
                std::any::type_name::<T>(),
            ),
        }
    }

    fn shrink_iter_mut<T: 'static>(&mut self, id: NodeId) -> &mut BoxShrink<T> {
        let path = self.path(id);
        self.nodes[id]
            .shrink_iter
            .as_mut()
            .expect("shrink iterator consulted before initialization")
            .downcast_mut::<BoxShrink<T>>()
            .unwrap_or_else(|| {
                panic!("generator at {path} was replaced with one producing a different type while its shrink state was live")
            })
    }

    /// Promote the proposal at `id` into its accepted slot and clear the
    /// iterator; the next round re-initializes it from the accepted value.
    fn accept_shrink(&mut self, id: NodeId) {
        if let Some(shrunk) = self.nodes[id].shrunk.take() {
            self.nodes[id].accepted = Some(shrunk);
            self.nodes[id].shrink_iter = None;
        }
    }

    fn push_node(&mut self, parent: NodeId) -> NodeId {
        self.nodes.push(RoseNode::new(Some(parent)));
        self.nodes.len() - 1
    }

    /// The string rendering of the value at `id`, or an empty string if no
    /// generator has run there.
    fn string_value(&mut self, id: NodeId) -> String {
        if let Some(generator) = self.nodes[id].active_generator().map(|g| g.clone_box()) {
            generator.produce_string(self, id)
        } else {
            String::new()
        }
    }

    fn render_node(&self, id: NodeId, out: &mut String) {
        for _ in 0..self.depth(id) {
            out.push_str("  ");
        }
        out.push_str("- ");
        out.push_str(&self.description(id));
        out.push('\n');
        for &child in &self.nodes[id].children {
            self.render_node(child, out);
        }
    }

    fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut node = id;
        while let Some(parent) = self.nodes[node].parent {
            depth += 1;
            node = parent;
        }
        depth
    }

    /// The name of the active generator at `id`.
    fn description(&self, id: NodeId) -> String {
        self.nodes[id]
            .active_generator()
            .map(|g| g.name().to_string())
            .unwrap_or_default()
    }

    /// Slash-separated generator names from the root to `id`.
    fn path(&self, id: NodeId) -> String {
        match self.nodes[id].parent {
            None => format!("/ {}", self.description(id)),
            Some(parent) => format!("{} / {}", self.path(parent), self.description(id)),
        }
    }
}

/// The ambient bindings a generator reads while producing: the node whose
/// children new picks attach to, and the cursor into those children.
///
/// Every regeneration enters a fresh scope; the previous one is restored
/// when the frame unwinds, on every exit path.
pub struct Context<'a> {
    rose: &'a mut Rose,
    current: NodeId,
    next_child: usize,
}

impl Context<'_> {
    /// The atom for the current node, drawn from the random source on first
    /// use and cached for the node's lifetime.
    pub fn atom(&mut self) -> Atom {
        if let Some(atom) = self.rose.nodes[self.current].atom {
            return atom;
        }
        let atom = self.rose.source.next_atom();
        self.rose.nodes[self.current].atom = Some(atom);
        atom
    }

    /// Delegate production of a sub-value to a child of the current node.
    ///
    /// The k-th pick during any regeneration routes to child k; new children
    /// are only ever appended at the tail, so sub-values keep their sites
    /// across regenerations.
    pub fn pick<T>(&mut self, gen: &Gen<T>) -> T
    where
        T: Clone + Debug + 'static,
    {
        let index = self.next_child;
        if index >= self.rose.nodes[self.current].children.len() {
            let child = self.rose.push_node(self.current);
            self.rose.nodes[self.current].children.push(child);
        }
        self.next_child += 1;
        let child = self.rose.nodes[self.current].children[index];
        self.rose.generate_at(child, gen)
    }

    /// Slash-separated generator names from the root to the current node.
    pub fn path(&self) -> String {
        self.rose.path(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atoms_are_stable_across_regenerations() {
        let gen = Gen::new(|ctx: &mut Context<'_>| ctx.atom()).named("atom");
        let mut rose = Rose::with_seed(42);
        let first = rose.generate(&gen);
        let second = rose.generate(&gen);
        assert_eq!(first, second);
    }

    #[test]
    fn picks_route_to_the_same_children() {
        let atom = Gen::new(|ctx: &mut Context<'_>| ctx.atom()).named("atom");
        let pair = {
            let atom = atom.clone();
            Gen::new(move |ctx| (ctx.pick(&atom), ctx.pick(&atom))).named("pair")
        };
        let mut rose = Rose::with_seed(7);
        let first = rose.generate(&pair);
        let second = rose.generate(&pair);
        assert_eq!(first, second);
        assert_ne!(first.0, first.1, "children draw distinct atoms");
        assert_eq!(rose.example().len(), 2);
    }

    #[test]
    fn generate_is_stable_without_a_shrink_in_progress() {
        let gen = Gen::int_range(0, 1_000_000);
        let mut rose = Rose::with_seed(99);
        let first = rose.generate(&gen);
        let second = rose.generate(&gen);
        assert_eq!(first, second);
    }

    #[test]
    fn same_seed_produces_the_same_tree() {
        let gen = Gen::vec_of(Gen::int_range(0, 100), 8);
        let mut a = Rose::with_seed(5);
        let mut b = Rose::with_seed(5);
        assert_eq!(a.generate(&gen), b.generate(&gen));
    }

    #[test]
    fn example_renders_each_immediate_child() {
        let one = Gen::constant(1i64).named("one");
        let two = Gen::constant(2i64).named("two");
        let pair = Gen::new(move |ctx| (ctx.pick(&one), ctx.pick(&two))).named("pair");
        let mut rose = Rose::with_seed(0);
        rose.generate(&pair);
        assert_eq!(rose.example(), vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn render_lists_generator_names_by_depth() {
        let inner = Gen::constant(0i64).named("leaf");
        let outer = Gen::new(move |ctx| ctx.pick(&inner)).named("outer");
        let mut rose = Rose::with_seed(0);
        rose.generate(&outer);
        assert_eq!(rose.render(), "- outer\n  - leaf\n");

        let mut bytes = Vec::new();
        rose.print(&mut bytes).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "- outer\n  - leaf\n");
    }

    #[test]
    fn context_path_names_the_lineage() {
        let leaf = Gen::new(|ctx: &mut Context<'_>| ctx.path()).named("leaf");
        let outer = Gen::new(move |ctx| ctx.pick(&leaf)).named("outer");
        let mut rose = Rose::with_seed(0);
        let path = rose.generate(&outer);
        assert_eq!(path, "/ outer / leaf");
    }

    #[test]
    fn accepted_shrinks_never_revert() {
        let int = Gen::new(|_ctx| 8i64).with_shrink(|v| crate::shrink::halving(v)).named("int");
        let outcome = Gen::new(move |ctx| ctx.pick(&int) < 2).named("lt2");
        let mut rose = Rose::with_seed(0);
        assert!(!rose.generate(&outcome));

        let result = rose.shrink(&outcome);
        assert!(result.success);
        // 8 -> 4 -> 2 accepted; 1 and 0 over-simplify.
        assert_eq!(rose.example(), vec!["2".to_string()]);

        // Another full round neither reverts nor mutates the accepted value.
        let again = rose.shrink(&outcome);
        assert!(!again.success);
        assert_eq!(rose.example(), vec!["2".to_string()]);
    }

    #[test]
    #[should_panic(expected = "different type")]
    fn changing_generator_type_with_live_state_panics() {
        use std::cell::Cell;

        let int = Gen::new(|_ctx| 4i64).with_shrink(|v| crate::shrink::halving(v)).named("int");
        let text = Gen::new(|_ctx| String::from("x")).named("text");
        // Switches the type it picks at child 0 once shrink state is live.
        let calls = Cell::new(0u32);
        let fickle = Gen::new(move |ctx| {
            calls.set(calls.get() + 1);
            if calls.get() <= 2 {
                ctx.pick(&int) < 0
            } else {
                ctx.pick(&text).is_empty()
            }
        })
        .named("fickle");

        let mut rose = Rose::with_seed(0);
        rose.shrink(&fickle);
    }
}
