#![forbid(unsafe_code)]

use quivela_ast::{Bounds, Expr};

use crate::error::{CheckError, Location};

/// `left ~[distance] right` for all values of `vars`.
#[derive(Clone, Debug)]
pub struct Equiv {
    pub left: Expr,
    pub right: Expr,
    pub vars: Vec<String>,
    pub distance: Bounds,
}

/// An equivalence being proven. Tactics transform the working copies
/// `left` and `right` and charge their cost to `distance`.
#[derive(Clone, Debug)]
pub struct Goal {
    pub equiv: Equiv,
    pub left: Expr,
    pub right: Expr,
    pub distance: Bounds,
}

impl Goal {
    pub fn new(equiv: Equiv) -> Self {
        Self {
            left: equiv.left.clone(),
            right: equiv.right.clone(),
            distance: Bounds::zero(),
            equiv,
        }
    }
}

/// A subgoal whose right-hand side is still being assembled.
#[derive(Clone, Debug)]
pub struct Builder {
    pub left: Expr,
    pub right: Expr,
    pub vars: Vec<String>,
    pub distance: Bounds,
}

impl Builder {
    pub fn build(self) -> Goal {
        Goal::new(Equiv {
            left: self.left,
            right: self.right,
            vars: self.vars,
            distance: self.distance,
        })
    }
}

#[derive(Clone, Debug)]
pub enum Obligation {
    Goal(Goal),
    Builder(Builder),
}

#[derive(Debug, Default)]
pub struct ObligationStack {
    stack: Vec<Obligation>,
}

impl ObligationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, obligation: Obligation) {
        self.stack.push(obligation);
    }

    pub fn pop(&mut self) -> Option<Obligation> {
        self.stack.pop()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Drops everything pushed above `len`.
    pub fn truncate(&mut self, len: usize) {
        self.stack.truncate(len);
    }

    pub fn goal_mut(&mut self, at: &Location) -> Result<&mut Goal, CheckError> {
        match self.stack.last_mut() {
            Some(Obligation::Goal(goal)) => Ok(goal),
            _ => Err(at.error("Not an equivalence obligation")),
        }
    }

    pub fn builder_mut(&mut self, at: &Location) -> Result<&mut Builder, CheckError> {
        match self.stack.last_mut() {
            Some(Obligation::Builder(builder)) => Ok(builder),
            _ => Err(at.error("Not an equivalence builder obligation")),
        }
    }

    pub fn pop_goal(&mut self, at: &Location) -> Result<Goal, CheckError> {
        self.goal_mut(at)?;
        match self.stack.pop() {
            Some(Obligation::Goal(goal)) => Ok(goal),
            _ => Err(at.error("Not an equivalence obligation")),
        }
    }

    /// Turns the builder on top into a goal.
    pub fn finish_builder(&mut self, at: &Location) -> Result<(), CheckError> {
        self.builder_mut(at)?;
        if let Some(Obligation::Builder(builder)) = self.stack.pop() {
            self.stack.push(Obligation::Goal(builder.build()));
        }
        Ok(())
    }

    pub fn ensure_empty(&self, at: &Location) -> Result<(), CheckError> {
        if self.stack.is_empty() {
            Ok(())
        } else {
            Err(at.error("Proof obligations remain."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equiv() -> Equiv {
        Equiv {
            left: Expr::lookup("a"),
            right: Expr::lookup("b"),
            vars: vec![],
            distance: Bounds::zero(),
        }
    }

    #[test]
    fn goal_and_builder_accessors_check_the_top() {
        let at = Location::detached("t.qvl");
        let mut stack = ObligationStack::new();
        assert_eq!(
            stack.goal_mut(&at).unwrap_err().message(),
            "Not an equivalence obligation"
        );
        stack.push(Obligation::Goal(Goal::new(equiv())));
        assert!(stack.goal_mut(&at).is_ok());
        assert_eq!(
            stack.builder_mut(&at).unwrap_err().message(),
            "Not an equivalence builder obligation"
        );
    }

    #[test]
    fn builders_become_goals() {
        let at = Location::detached("t.qvl");
        let mut stack = ObligationStack::new();
        stack.push(Obligation::Builder(Builder {
            left: Expr::lookup("a"),
            right: Expr::lookup("c"),
            vars: vec!["x".into()],
            distance: Bounds::zero(),
        }));
        stack.finish_builder(&at).unwrap();
        let goal = stack.pop_goal(&at).unwrap();
        assert_eq!(goal.equiv.vars, ["x"]);
        assert_eq!(goal.right.as_lookup(), Some("c"));
        assert!(stack.ensure_empty(&at).is_ok());
    }

    #[test]
    fn leftover_obligations_are_reported() {
        let at = Location::detached("t.qvl");
        let mut stack = ObligationStack::new();
        stack.push(Obligation::Goal(Goal::new(equiv())));
        assert_eq!(
            stack.ensure_empty(&at).unwrap_err().message(),
            "Proof obligations remain."
        );
    }
}
