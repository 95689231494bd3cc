//! Planning subsystem.
//!
//! A [`Planner`] receives a packaged [`Problem`] and returns a [`Plan`]
//! naming the algorithm variant it selected. [`StandardPlanner`] holds the
//! standard variants from [`solvers`] and compares them through the
//! registered cost hook, so that every process of a group selects the
//! same variant.

pub mod solvers;

use std::fmt;

use crate::core::types::{Extent, PlanRigor};
use crate::plan::cost::{CostHook, CostKind};
use crate::plan::problem::Problem;

pub use solvers::{standard_solvers, CostEstimate, Solver};

/// Interface between the plan builder and the planning machinery.
pub trait Planner {
    /// Install the hook used to combine candidate costs across processes
    ///
    /// # Arguments
    ///
    /// * `hook` - Called with every problem and local cost the planner compares
    fn register_cost_hook(&mut self, hook: CostHook);

    /// Register the standard algorithm variants
    fn register_default_algorithms(&mut self);

    /// Release registered variants and hooks
    fn cleanup(&mut self);

    /// Select an algorithm for `problem`
    ///
    /// # Arguments
    ///
    /// * `problem` - The validated problem; ownership moves into the plan
    /// * `rigor` - How many candidates to compare
    ///
    /// # Returns
    ///
    /// `None` when no registered variant applies.
    fn build_plan<'a>(&mut self, problem: Problem<'a>, rigor: PlanRigor) -> Option<Plan<'a>>;
}

/// Handle for a planned distributed operation.
#[derive(Debug)]
pub struct Plan<'a> {
    problem: Problem<'a>,
    solver: &'static str,
    cost: f64,
    buffer_need: Extent,
}

impl<'a> Plan<'a> {
    pub fn new(problem: Problem<'a>, solver: &'static str, cost: f64, buffer_need: Extent) -> Self {
        Plan {
            problem,
            solver,
            cost,
            buffer_need,
        }
    }

    /// The planned problem.
    pub fn problem(&self) -> &Problem<'a> {
        &self.problem
    }

    /// Name of the selected variant.
    pub fn solver(&self) -> &'static str {
        self.solver
    }

    /// Agreed cost of the selected variant (local model under estimate rigor).
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Elements the calling process's buffers must hold.
    pub fn buffer_need(&self) -> Extent {
        self.buffer_need
    }

    /// Give the problem (and its buffers) back.
    pub fn into_problem(self) -> Problem<'a> {
        self.problem
    }
}

/// Reference planner over the standard variants.
#[derive(Default)]
pub struct StandardPlanner {
    cost_hook: Option<CostHook>,
    solvers: Vec<Box<dyn Solver>>,
    cost_kind: CostKind,
}

impl fmt::Debug for StandardPlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardPlanner")
            .field("cost_hook", &self.cost_hook.is_some())
            .field("solvers", &self.solver_names())
            .field("cost_kind", &self.cost_kind)
            .finish()
    }
}

impl StandardPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Planner combining distributed costs with the given reduction.
    pub fn with_cost_kind(cost_kind: CostKind) -> Self {
        StandardPlanner {
            cost_kind,
            ..Self::default()
        }
    }

    pub fn cost_kind(&self) -> CostKind {
        self.cost_kind
    }

    pub fn set_cost_kind(&mut self, cost_kind: CostKind) {
        self.cost_kind = cost_kind;
    }

    /// Add a variant after the registered ones.
    pub fn register_solver(&mut self, solver: Box<dyn Solver>) {
        log::debug!("registering solver {}", solver.name());
        self.solvers.push(solver);
    }

    /// Names of the registered variants, in registration order.
    pub fn solver_names(&self) -> Vec<&'static str> {
        self.solvers.iter().map(|s| s.name()).collect()
    }

    pub fn has_cost_hook(&self) -> bool {
        self.cost_hook.is_some()
    }

    fn hook(&self, problem: &Problem<'_>, cost: f64, kind: CostKind) -> f64 {
        match self.cost_hook {
            Some(hook) => hook(problem, cost, kind),
            None => cost,
        }
    }

    /// Cost of a candidate as every process of the group sees it.
    fn agreed_cost(&self, problem: &Problem<'_>, estimate: &CostEstimate) -> f64 {
        let local: f64 = estimate
            .local_steps
            .iter()
            .map(|step| {
                let serial = Problem::Serial(step.clone());
                self.hook(&serial, step.cost(), CostKind::Sum)
            })
            .sum::<f64>()
            + estimate.communication;
        self.hook(problem, local, self.cost_kind)
    }
}

impl Planner for StandardPlanner {
    fn register_cost_hook(&mut self, hook: CostHook) {
        self.cost_hook = Some(hook);
    }

    fn register_default_algorithms(&mut self) {
        for solver in standard_solvers() {
            self.register_solver(solver);
        }
    }

    fn cleanup(&mut self) {
        self.solvers.clear();
        self.cost_hook = None;
    }

    fn build_plan<'a>(&mut self, problem: Problem<'a>, rigor: PlanRigor) -> Option<Plan<'a>> {
        let candidates = self
            .solvers
            .iter()
            .filter(|s| rigor == PlanRigor::Patient || !s.patient_only());

        let mut best: Option<(f64, &'static str, Extent)> = None;
        for solver in candidates {
            let Some(estimate) = solver.estimate(&problem) else {
                continue;
            };
            if rigor == PlanRigor::Estimate {
                let local = estimate.local_steps.iter().map(|s| s.cost()).sum::<f64>()
                    + estimate.communication;
                best = Some((local, solver.name(), estimate.buffer_need));
                break;
            }
            let cost = self.agreed_cost(&problem, &estimate);
            log::debug!("{} candidate {}: cost {:.1}", problem.family(), solver.name(), cost);
            if best.map_or(true, |(c, _, _)| cost < c) {
                best = Some((cost, solver.name(), estimate.buffer_need));
            }
        }

        let (cost, solver, buffer_need) = best?;
        log::debug!(
            "{} plan: {} (cost {:.1}, buffer {})",
            problem.family(),
            solver,
            cost,
            buffer_need
        );
        Some(Plan::new(problem, solver, cost, buffer_need))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::network::SingleProcessGroup;
    use crate::core::types::DistFlags;
    use crate::plan::cost::arbitrate;
    use crate::plan::problem::{Buffers, SerialProblem, TransposeProblem};

    #[test]
    fn test_unregistered_planner_declines() {
        let mut planner = StandardPlanner::new();
        let group = SingleProcessGroup;
        let mut data = vec![0.0f64; 4];
        let problem = Problem::Transpose(TransposeProblem::new(
            2,
            2,
            1,
            2,
            2,
            DistFlags::NONE,
            &group,
            Buffers::InPlace(&mut data),
        ));
        assert!(planner.build_plan(problem, PlanRigor::Measure).is_none());
    }

    #[test]
    fn test_register_and_cleanup() {
        let mut planner = StandardPlanner::with_cost_kind(CostKind::Sum);
        planner.register_cost_hook(arbitrate);
        planner.register_default_algorithms();
        assert!(planner.has_cost_hook());
        assert_eq!(planner.solver_names().len(), 7);
        assert_eq!(planner.cost_kind(), CostKind::Sum);

        planner.cleanup();
        assert!(!planner.has_cost_hook());
        assert!(planner.solver_names().is_empty());
    }

    #[test]
    fn test_serial_problem_has_no_solver() {
        let mut planner = StandardPlanner::new();
        planner.register_default_algorithms();
        let problem = Problem::Serial(SerialProblem::dft(vec![4], 1));
        assert!(planner.build_plan(problem, PlanRigor::Patient).is_none());
    }

    #[test]
    fn test_transpose_plan_rigor() {
        let mut planner = StandardPlanner::new();
        planner.register_cost_hook(arbitrate);
        planner.register_default_algorithms();
        let group = SingleProcessGroup;

        for rigor in [PlanRigor::Estimate, PlanRigor::Measure, PlanRigor::Patient] {
            let mut data = vec![0.0f64; 12];
            let problem = Problem::Transpose(TransposeProblem::new(
                3,
                4,
                1,
                3,
                4,
                DistFlags::NONE,
                &group,
                Buffers::InPlace(&mut data),
            ));
            let plan = planner.build_plan(problem, rigor).unwrap();
            assert_eq!(plan.solver(), "transpose-pairwise");
            assert_eq!(plan.buffer_need(), 12);
            assert!(plan.cost() > 0.0);
        }
    }
}
