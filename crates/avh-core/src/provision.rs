// ── Instance acquisition ──
//
// Either look up an existing instance or create a new one from the
// catalog. A created instance is recorded in the caller's lease slot as
// soon as the service confirms it, so teardown can delete it even if it
// never boots.

use avh_api::{InstanceState, NewInstance};
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::VirtualHardware;
use crate::config::{InstanceSource, WaitPolicy};
use crate::error::CoreError;
use crate::select::first_by_prefix;
use crate::wait::wait_for_state;

/// An instance held by the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceLease {
    pub id: Uuid,
    /// `true` if this run created the instance (and may delete it).
    pub created: bool,
}

/// Resolve the configured instance source into a running instance.
pub async fn acquire_instance<H: VirtualHardware>(
    hw: &H,
    source: &InstanceSource,
    policy: &WaitPolicy,
    lease: &mut Option<InstanceLease>,
) -> Result<Uuid, CoreError> {
    match source {
        InstanceSource::Existing(id) => {
            info!(%id, "using existing instance");
            let instance = hw.get_instance(*id).await.map_err(|e| {
                if e.is_not_found() {
                    CoreError::InstanceNotFound { id: *id }
                } else {
                    e.into()
                }
            })?;
            *lease = Some(InstanceLease {
                id: instance.id,
                created: false,
            });
            debug!(
                id = %instance.id,
                name = ?instance.name,
                state = ?instance.state,
                "existing instance found"
            );
            Ok(instance.id)
        }
        InstanceSource::Create { model, name } => {
            info!(model, name, "creating new instance");
            create_instance(hw, model, name, policy, lease).await
        }
    }
}

/// Pick project, model, and initial software for a new instance.
///
/// Uses the first project of the account, the first model whose flavor
/// starts with `model_prefix`, and the first software build of that
/// model whose filename starts with `model_prefix`.
pub async fn plan_instance<H: VirtualHardware>(
    hw: &H,
    model_prefix: &str,
    name: &str,
) -> Result<NewInstance, CoreError> {
    let projects = hw.list_projects().await?;
    let project = projects.first().ok_or(CoreError::NoProject)?;
    info!(project = %project.id, "chose project");

    let models = hw.list_models().await?;
    let model =
        first_by_prefix(&models, model_prefix, |m| &m.flavor).ok_or_else(|| {
            CoreError::NoMatchingModel {
                prefix: model_prefix.into(),
                available: models
                    .iter()
                    .map(|m| m.flavor.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        })?;
    info!(flavor = %model.flavor, "chose model");

    let software = hw.list_model_software(&model.model).await?;
    let build = first_by_prefix(&software, model_prefix, |s| &s.filename).ok_or_else(|| {
        CoreError::NoMatchingSoftware {
            model: model.model.clone(),
            prefix: model_prefix.into(),
        }
    })?;
    info!(filename = %build.filename, "chose initial software");

    Ok(NewInstance {
        name: name.into(),
        project: project.id,
        flavor: model.flavor.clone(),
        os: build.version.clone(),
        osbuild: build.buildid.clone(),
    })
}

/// Create a new instance and wait until it is `on`.
///
/// The instance is billable from the moment it is created; it is written
/// to `lease` before waiting so the caller can delete it on failure.
pub async fn create_instance<H: VirtualHardware>(
    hw: &H,
    model_prefix: &str,
    name: &str,
    policy: &WaitPolicy,
    lease: &mut Option<InstanceLease>,
) -> Result<Uuid, CoreError> {
    let request = plan_instance(hw, model_prefix, name).await?;
    let created = hw.create_instance(&request).await?;
    *lease = Some(InstanceLease {
        id: created.id,
        created: true,
    });
    info!(id = %created.id, "instance created, waiting for it to start");

    wait_for_state(hw, created.id, InstanceState::On, policy).await?;
    Ok(created.id)
}
