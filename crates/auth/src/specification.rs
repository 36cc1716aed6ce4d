//! Composable, pure predicates.
//!
//! A [`Specification`] is a tree of named leaf predicates joined by AND, OR
//! and NOT, evaluated by one recursive interpreter. Evaluation has no side
//! effects: the same tree applied to the same subject always yields the same
//! [`SpecificationResult`].
//!
//! AND stops at the first failing branch and OR at the first passing one. A
//! failed result carries the violations of every branch that was evaluated;
//! a satisfied result carries none.

use std::borrow::Cow;
use std::sync::Arc;

use serde::Serialize;

type Predicate<T> = dyn Fn(&T) -> bool + Send + Sync;

/// A failed leaf: which rule, and why.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Violation {
    pub rule: Cow<'static, str>,
    pub message: Cow<'static, str>,
}

impl Violation {
    pub fn new(rule: impl Into<Cow<'static, str>>, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

impl core::fmt::Display for Violation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.rule, self.message)
    }
}

/// Outcome of evaluating a specification. Satisfied iff no violations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpecificationResult {
    violations: Vec<Violation>,
}

impl SpecificationResult {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn fail(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Identifiers of the violated leaves, in evaluation order.
    pub fn violated_rules(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|v| v.rule.as_ref())
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Append the violations of `other` (both must have failed).
    fn merge(mut self, other: SpecificationResult) -> Self {
        self.violations.extend(other.violations);
        self
    }
}

/// Predicate tree over subjects of type `T`.
pub enum Specification<T> {
    Leaf {
        name: Cow<'static, str>,
        message: Cow<'static, str>,
        test: Arc<Predicate<T>>,
    },
    And(Box<Specification<T>>, Box<Specification<T>>),
    Or(Box<Specification<T>>, Box<Specification<T>>),
    Not(Box<Specification<T>>),
}

impl<T: 'static> Specification<T> {
    /// A named predicate; `message` is reported when it does not hold.
    pub fn leaf(
        name: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
        test: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Specification::Leaf {
            name: name.into(),
            message: message.into(),
            test: Arc::new(test),
        }
    }

    pub fn and(self, other: Specification<T>) -> Self {
        Specification::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Specification<T>) -> Self {
        Specification::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Specification::Not(Box::new(self))
    }

    /// AND of every specification in order; `None` when empty.
    pub fn all(specs: impl IntoIterator<Item = Specification<T>>) -> Option<Self> {
        specs.into_iter().reduce(Specification::and)
    }

    pub fn is_satisfied_by(&self, subject: &T) -> SpecificationResult {
        match self {
            Specification::Leaf {
                name,
                message,
                test,
            } => {
                if (**test)(subject) {
                    SpecificationResult::pass()
                } else {
                    SpecificationResult::fail(Violation::new(name.clone(), message.clone()))
                }
            }
            Specification::And(left, right) => {
                let left = left.is_satisfied_by(subject);
                if !left.is_satisfied() {
                    return left;
                }
                right.is_satisfied_by(subject)
            }
            Specification::Or(left, right) => {
                let left = left.is_satisfied_by(subject);
                if left.is_satisfied() {
                    return left;
                }
                let right = right.is_satisfied_by(subject);
                if right.is_satisfied() {
                    return right;
                }
                left.merge(right)
            }
            Specification::Not(inner) => {
                if inner.is_satisfied_by(subject).is_satisfied() {
                    SpecificationResult::fail(Violation::new(
                        format!("not({})", inner.describe()),
                        format!("{} must not hold", inner.describe()),
                    ))
                } else {
                    SpecificationResult::pass()
                }
            }
        }
    }

    /// Render the tree, e.g. `(same_tenant and not(expired))`.
    pub fn describe(&self) -> String {
        match self {
            Specification::Leaf { name, .. } => name.to_string(),
            Specification::And(l, r) => format!("({} and {})", l.describe(), r.describe()),
            Specification::Or(l, r) => format!("({} or {})", l.describe(), r.describe()),
            Specification::Not(inner) => format!("not({})", inner.describe()),
        }
    }
}

impl<T> Clone for Specification<T> {
    fn clone(&self) -> Self {
        match self {
            Specification::Leaf {
                name,
                message,
                test,
            } => Specification::Leaf {
                name: name.clone(),
                message: message.clone(),
                test: Arc::clone(test),
            },
            Specification::And(l, r) => Specification::And(l.clone(), r.clone()),
            Specification::Or(l, r) => Specification::Or(l.clone(), r.clone()),
            Specification::Not(inner) => Specification::Not(inner.clone()),
        }
    }
}

impl<T: 'static> core::fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Specification").field(&self.describe()).finish()
    }
}

impl<T: 'static> core::ops::BitAnd for Specification<T> {
    type Output = Specification<T>;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl<T: 'static> core::ops::BitOr for Specification<T> {
    type Output = Specification<T>;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl<T: 'static> core::ops::Not for Specification<T> {
    type Output = Specification<T>;

    fn not(self) -> Self::Output {
        Specification::not(self)
    }
}
