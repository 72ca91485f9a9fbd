//! Branching step.

use std::fmt;
use std::sync::Arc;

use super::{Step, StepRef, Transition};

type Predicate<C> = Box<dyn Fn(&C) -> bool + Send + Sync>;

/// Chooses between two continuations by evaluating a predicate on the
/// context. Never declares a perf name: the test itself is not timed.
pub struct ConditionStep<C> {
    name: String,
    predicate: Predicate<C>,
    when_true: Transition<C>,
    when_false: Transition<C>,
}

impl<C> ConditionStep<C> {
    pub fn new<F>(
        name: impl Into<String>,
        predicate: F,
        when_true: Transition<C>,
        when_false: Transition<C>,
    ) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
            when_true,
            when_false,
        }
    }
}

impl<C: 'static> ConditionStep<C> {
    pub fn into_ref(self) -> StepRef<C> {
        Arc::new(self)
    }
}

impl<C> fmt::Debug for ConditionStep<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionStep")
            .field("name", &self.name)
            .field("when_true", &self.when_true)
            .field("when_false", &self.when_false)
            .finish()
    }
}

impl<C> Step<C> for ConditionStep<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, ctx: &mut C) -> anyhow::Result<Transition<C>> {
        if (self.predicate)(ctx) {
            Ok(self.when_true.clone())
        } else {
            Ok(self.when_false.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{ActionStep, EndStep};

    #[test]
    fn picks_branch_from_predicate() {
        let production: StepRef<bool> = ActionStep::new("Production", |_: &mut bool| Ok(())).into_ref();
        let idle: StepRef<bool> = EndStep::new().into_ref();
        let switch = ConditionStep::new(
            "ProductionSwitch",
            |in_production: &bool| *in_production,
            Transition::Next(production),
            Transition::Next(idle),
        );

        assert_eq!(switch.execute(&mut true).unwrap().step_name(), Some("Production"));
        assert_eq!(switch.execute(&mut false).unwrap().step_name(), Some("End"));
    }

    #[test]
    fn branch_may_finish_the_run() {
        let check = ConditionStep::new(
            "IsCleanupRequired",
            |n: &u32| *n > 0,
            Transition::Done,
            Transition::Done,
        );
        assert!(check.execute(&mut 3).unwrap().is_done());
        assert!(check.perf_name().is_none());
    }
}
