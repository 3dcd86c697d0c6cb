//! Standalone host: reconcile declared resources against the state file.
//!
//! Every declared resource is planned against its prior state, resources that
//! are in state but no longer declared are destroyed, and all of it runs
//! concurrently since distinct resources share nothing. One resource failing
//! never stops the others; each outcome is reported and the state file keeps
//! whatever the successful operations produced.

use crate::config::schema::{AppConfig, ResourceConfig};
use crate::error::Result;
use crate::resource::{diff, Lifecycle, Plan, ResourceState};
use crate::store::StateFile;
use futures::future::join_all;
use tracing::{error, info, info_span, Instrument};

/// A planned change to one named resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub name: String,
    pub plan: Plan,
}

/// What happened to one resource during an apply.
#[derive(Debug)]
pub struct Outcome {
    pub name: String,
    pub plan: Plan,
    pub result: Result<()>,
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub outcomes: Vec<Outcome>,
}

impl ApplyReport {
    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// One lifecycle call, with everything it needs owned or borrowed from config.
enum Work<'a> {
    Create(&'a ResourceConfig),
    Update {
        prior: ResourceState,
        config: &'a ResourceConfig,
        plan: Plan,
    },
    Read(ResourceState),
    Destroy(ResourceState),
}

impl Work<'_> {
    fn plan(&self) -> Plan {
        match self {
            Work::Create(_) => Plan::Create,
            Work::Update { plan, .. } => *plan,
            Work::Read(_) => Plan::NoOp,
            Work::Destroy(_) => Plan::Destroy,
        }
    }
}

enum StateChange {
    Keep,
    Put(ResourceState),
    Remove,
}

fn schedule<'a>(config: &'a AppConfig, state: &StateFile) -> Vec<(String, Work<'a>)> {
    let mut work = Vec::with_capacity(config.resources.len());

    for (name, resource) in &config.resources {
        let prior = state.resources.get(name);
        let item = match (diff::plan(prior, resource), prior.cloned()) {
            (_, None) => Work::Create(resource),
            (Plan::NoOp, Some(prior)) => Work::Read(prior),
            (plan, Some(prior)) => Work::Update {
                prior,
                config: resource,
                plan,
            },
        };
        work.push((name.clone(), item));
    }

    for (name, prior) in &state.resources {
        if !config.resources.contains_key(name) {
            work.push((name.clone(), Work::Destroy(prior.clone())));
        }
    }

    work
}

/// Plan every resource without running anything.
pub fn plan(config: &AppConfig, state: &StateFile) -> Vec<Change> {
    schedule(config, state)
        .into_iter()
        .map(|(name, work)| Change {
            name,
            plan: work.plan(),
        })
        .collect()
}

/// Bring `state` in line with `config`.
pub async fn apply<L: Lifecycle>(
    controller: &L,
    config: &AppConfig,
    state: &mut StateFile,
) -> ApplyReport {
    let work = schedule(config, state);
    run(controller, work, state).await
}

/// Destroy every resource in `state`.
pub async fn destroy_all<L: Lifecycle>(controller: &L, state: &mut StateFile) -> ApplyReport {
    let work = state
        .resources
        .iter()
        .map(|(name, prior)| (name.clone(), Work::Destroy(prior.clone())))
        .collect();
    run(controller, work, state).await
}

async fn run<L: Lifecycle>(
    controller: &L,
    work: Vec<(String, Work<'_>)>,
    state: &mut StateFile,
) -> ApplyReport {
    let tasks = work.into_iter().map(|(name, item)| {
        let span = info_span!("resource", name = %name);
        async move {
            let plan = item.plan();
            info!("{plan}");
            let (change, result) = perform(controller, item).await;
            if let Err(e) = &result {
                error!("{e}");
            }
            (name, plan, change, result)
        }
        .instrument(span)
    });

    let mut report = ApplyReport::default();
    for (name, plan, change, result) in join_all(tasks).await {
        match change {
            StateChange::Keep => {}
            StateChange::Put(new_state) => {
                state.resources.insert(name.clone(), new_state);
            }
            StateChange::Remove => {
                state.resources.remove(&name);
            }
        }
        report.outcomes.push(Outcome { name, plan, result });
    }
    report
}

async fn perform<L: Lifecycle>(controller: &L, work: Work<'_>) -> (StateChange, Result<()>) {
    match work {
        Work::Create(config) => match controller.create(config).await {
            Ok(new_state) => (StateChange::Put(new_state), Ok(())),
            Err(e) => (StateChange::Keep, Err(e)),
        },
        Work::Update { prior, config, .. } => match controller.update(&prior, config).await {
            Ok(new_state) => (StateChange::Put(new_state), Ok(())),
            Err(e) => (StateChange::Keep, Err(e)),
        },
        Work::Read(prior) => (StateChange::Put(controller.read(prior)), Ok(())),
        // Destroy must always complete, even when its command fails.
        Work::Destroy(prior) => (StateChange::Remove, controller.destroy(prior).await),
    }
}
