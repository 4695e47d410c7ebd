//! Composable boolean predicates.

use std::fmt;
use std::ops;
use std::sync::Arc;

type Test<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A boolean test over `T`, built from atomic tests with AND, OR and NOT.
///
/// Atomic tests must be pure. `eval` short-circuits, so a test may not run
/// at all for a given value.
///
/// Chains of the same operator are kept flat: `a.and(b).and(c)` is one
/// `All` with three operands.
pub enum Predicate<T: ?Sized> {
    Atomic(Test<T>),
    All(Vec<Predicate<T>>),
    Any(Vec<Predicate<T>>),
    Not(Box<Predicate<T>>),
}

impl<T: ?Sized> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        match self {
            Predicate::Atomic(test) => Predicate::Atomic(test.clone()),
            Predicate::All(ps) => Predicate::All(ps.clone()),
            Predicate::Any(ps) => Predicate::Any(ps.clone()),
            Predicate::Not(p) => Predicate::Not(p.clone()),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Atomic(_) => f.write_str("Atomic"),
            Predicate::All(ps) => f.debug_tuple("All").field(ps).finish(),
            Predicate::Any(ps) => f.debug_tuple("Any").field(ps).finish(),
            Predicate::Not(p) => f.debug_tuple("Not").field(p).finish(),
        }
    }
}

impl<T: ?Sized + 'static> Predicate<T> {
    pub fn atomic<F>(test: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Predicate::Atomic(Arc::new(test))
    }

    pub fn always(value: bool) -> Self {
        Predicate::atomic(move |_| value)
    }

    pub fn and(self, other: Predicate<T>) -> Self {
        let mut operands = match self {
            Predicate::All(ps) => ps,
            p => vec![p],
        };
        match other {
            Predicate::All(ps) => operands.extend(ps),
            p => operands.push(p),
        }
        Predicate::All(operands)
    }

    pub fn or(self, other: Predicate<T>) -> Self {
        let mut operands = match self {
            Predicate::Any(ps) => ps,
            p => vec![p],
        };
        match other {
            Predicate::Any(ps) => operands.extend(ps),
            p => operands.push(p),
        }
        Predicate::Any(operands)
    }

    pub fn eval(&self, value: &T) -> bool {
        match self {
            Predicate::Atomic(test) => test(value),
            Predicate::All(ps) => ps.iter().all(|p| p.eval(value)),
            Predicate::Any(ps) => ps.iter().any(|p| p.eval(value)),
            Predicate::Not(p) => !p.eval(value),
        }
    }

    /// Evaluate against a `U` by projecting it onto a `T`. Values that
    /// don't project fail the predicate.
    pub fn lift<U, F>(self, project: F) -> Predicate<U>
    where
        T: Sized,
        U: ?Sized + 'static,
        F: Fn(&U) -> Option<T> + Send + Sync + 'static,
    {
        Predicate::atomic(move |u: &U| project(u).is_some_and(|t| self.eval(&t)))
    }
}

impl<T: ?Sized + 'static> ops::Not for Predicate<T> {
    type Output = Predicate<T>;

    fn not(self) -> Self::Output {
        Predicate::Not(Box::new(self))
    }
}

impl<T: ?Sized + 'static> ops::BitAnd for Predicate<T> {
    type Output = Predicate<T>;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl<T: ?Sized + 'static> ops::BitOr for Predicate<T> {
    type Output = Predicate<T>;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}
