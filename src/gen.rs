//! Generators for test data.
//!
//! A [`Gen<T>`] carries two capabilities: producing a value against the
//! ambient [`Context`], and enumerating simpler candidates for a value it
//! produced. Generators are explicit, first-class values composed with
//! combinators rather than derived from types.
//!
//! Producing must be deterministic given the ambient context: the same node
//! state and source position always yield equal values. The engine relies on
//! this to re-generate values while shrinking.

use std::fmt::Debug;
use std::rc::Rc;

use crate::rose::Context;
use crate::shrink::{self, BoxShrink};

/// A generator of test data of type `T`.
pub struct Gen<T> {
    produce: Rc<dyn Fn(&mut Context<'_>) -> T>,
    shrinker: Rc<dyn Fn(T) -> BoxShrink<T>>,
    name: Rc<str>,
}

impl<T> Clone for Gen<T> {
    fn clone(&self) -> Self {
        Gen {
            produce: Rc::clone(&self.produce),
            shrinker: Rc::clone(&self.shrinker),
            name: Rc::clone(&self.name),
        }
    }
}

impl<T: 'static> Gen<T> {
    /// Create a generator from a produce function. The generator has no
    /// shrinks until one is attached with [`Gen::with_shrink`].
    pub fn new<F>(produce: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> T + 'static,
    {
        Gen {
            produce: Rc::new(produce),
            shrinker: Rc::new(|_| shrink::empty()),
            name: Rc::from("gen"),
        }
    }

    /// Attach a shrink function enumerating simpler candidates for a value.
    pub fn with_shrink<S>(mut self, shrinker: S) -> Self
    where
        S: Fn(T) -> BoxShrink<T> + 'static,
    {
        self.shrinker = Rc::new(shrinker);
        self
    }

    /// Name this generator for diagnostics (tree rendering, node paths).
    pub fn named(mut self, name: &str) -> Self {
        self.name = Rc::from(name);
        self
    }

    /// A generator that always yields `value` and shrinks to nothing.
    pub fn constant(value: T) -> Self
    where
        T: Clone,
    {
        Gen::new(move |_ctx| value.clone()).named("constant")
    }

    /// Produce a value against the ambient context.
    pub fn produce(&self, ctx: &mut Context<'_>) -> T {
        (self.produce)(ctx)
    }

    /// Enumerate candidates simpler than `value`, earliest preferred.
    pub fn shrink(&self, value: T) -> BoxShrink<T> {
        (self.shrinker)(value)
    }

    /// The diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Clone + Debug + 'static> Gen<T> {
    /// Map a function over generated values.
    ///
    /// The inner generator runs at a child node, so the pre-image keeps its
    /// own shrink site and mapped values simplify along with it.
    pub fn map<U, F>(self, f: F) -> Gen<U>
    where
        U: 'static,
        F: Fn(T) -> U + 'static,
    {
        Gen::new(move |ctx| f(ctx.pick(&self))).named("map")
    }

    /// Monadic bind for dependent generation. Both the source value and the
    /// derived generator's value get their own shrink sites.
    pub fn bind<U, F>(self, f: F) -> Gen<U>
    where
        U: Clone + Debug + 'static,
        F: Fn(T) -> Gen<U> + 'static,
    {
        Gen::new(move |ctx| {
            let value = ctx.pick(&self);
            ctx.pick(&f(value))
        })
        .named("bind")
    }
}

/// Primitive generators.
impl Gen<bool> {
    /// Generate a random boolean; `true` shrinks to `false`.
    pub fn bool() -> Self {
        Gen::new(|ctx| ctx.atom() & 1 == 1)
            .with_shrink(|value| shrink::unfold(value, |more| *more, |_| (false, false)))
            .named("bool")
    }
}

impl Gen<u64> {
    /// Generate a raw atom-width value, halving toward zero when shrinking.
    pub fn u64() -> Self {
        Gen::new(|ctx| ctx.atom()).with_shrink(shrink::halving).named("u64")
    }
}

impl Gen<i64> {
    /// Generate an integer in `min..=max`.
    ///
    /// Shrinking halves the distance to the origin, the in-range value
    /// closest to zero, and ends on the origin itself.
    pub fn int_range(min: i64, max: i64) -> Self {
        assert!(min <= max, "int_range requires min <= max");
        let origin = if min <= 0 && max >= 0 {
            0
        } else if min > 0 {
            min
        } else {
            max
        };
        Gen::new(move |ctx| {
            let span = max.wrapping_sub(min) as u64;
            let offset = if span == u64::MAX { ctx.atom() } else { ctx.atom() % (span + 1) };
            min.wrapping_add(offset as i64)
        })
        .with_shrink(move |value| {
            shrink::unfold(
                value,
                move |current| *current != origin,
                move |current| {
                    let next = origin + (current - origin) / 2;
                    (next, next)
                },
            )
        })
        .named("int_range")
    }

    /// Generate a positive integer.
    pub fn positive() -> Self {
        Self::int_range(1, i64::MAX)
    }

    /// Generate a natural number (including zero).
    pub fn natural() -> Self {
        Self::int_range(0, i64::MAX)
    }
}

impl<T> Gen<Vec<T>>
where
    T: Clone + Debug + 'static,
{
    /// Generate a vector of up to `max_len` elements.
    ///
    /// Each element is picked at its own child node, so elements shrink
    /// individually before the vector tries removing them; the vector's own
    /// shrinking drops one element at a time.
    pub fn vec_of(element: Gen<T>, max_len: usize) -> Self {
        Gen::new(move |ctx| {
            let len = (ctx.atom() % (max_len as u64 + 1)) as usize;
            (0..len).map(|_| ctx.pick(&element)).collect()
        })
        .with_shrink(shrink::remove_one)
        .named("vec_of")
    }
}

impl<T> Gen<Option<T>>
where
    T: Clone + Debug + 'static,
{
    /// Generate `None` about a quarter of the time, otherwise `Some` of the
    /// inner generator. `Some` shrinks to `None`; the inner value shrinks at
    /// its own node.
    pub fn option_of(inner: Gen<T>) -> Self {
        Gen::new(move |ctx| {
            if ctx.atom() % 4 == 0 {
                None
            } else {
                Some(ctx.pick(&inner))
            }
        })
        .with_shrink(|value| match value {
            Some(_) => shrink::unfold(true, |more| *more, |_| (None, false)),
            None => shrink::empty(),
        })
        .named("option_of")
    }
}

impl<A, B> Gen<(A, B)>
where
    A: Clone + Debug + 'static,
    B: Clone + Debug + 'static,
{
    /// Generate a pair, each component at its own child node.
    pub fn tuple_of(first: Gen<A>, second: Gen<B>) -> Self {
        Gen::new(move |ctx| (ctx.pick(&first), ctx.pick(&second))).named("tuple_of")
    }
}
