//! `flotilla rm`: remove stopped service containers.

use clap::Args;
use flotilla_compose::remove::RemoveOptions;

use crate::session::Session;

/// Arguments for the `rm` command.
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Services to remove. If empty, removes all.
    pub services: Vec<String>,

    /// Don't ask to confirm removal.
    #[arg(short, long)]
    pub force: bool,

    /// Stop the containers, if required, before removing.
    #[arg(short, long)]
    pub stop: bool,

    /// Remove anonymous volumes attached to the containers.
    #[arg(short, long)]
    pub volumes: bool,
}

/// Executes the `rm` command.
///
/// # Errors
///
/// Returns an error if a named service is still running or a removal fails.
pub async fn execute(args: RmArgs, session: &Session) -> anyhow::Result<()> {
    let options = RemoveOptions {
        services: args.services,
        project: session.project.clone(),
        force: args.force,
        stop: args.stop,
        volumes: args.volumes,
    };
    Ok(session.service.remove(&session.project_name, options).await?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use flotilla_common::error::FlotillaError;
    use flotilla_common::types::ContainerState;
    use flotilla_compose::progress::MemorySink;
    use flotilla_compose::service::ComposeService;
    use flotilla_runtime::backend::memory::{Fault, InMemoryRuntime, Operation};
    use flotilla_runtime::state::StateEntry;

    use super::*;

    #[tokio::test]
    async fn failed_removal_keeps_the_runtime_cause() {
        let runtime = Arc::new(InMemoryRuntime::new());
        let id = runtime
            .insert(StateEntry::service_replica("shop", "web", 1).with_state(ContainerState::Stopped));
        runtime.fail(&id, Operation::Remove, Fault::Conflict("volume in use".into()));
        let service = ComposeService::new(runtime).with_progress(Arc::new(MemorySink::new()));
        let session = Session::with_service("shop", service);

        let args = RmArgs {
            services: Vec::new(),
            force: true,
            stop: false,
            volumes: true,
        };
        let err = execute(args, &session).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<FlotillaError>(),
            Some(FlotillaError::Mutation { .. })
        ));
        let causes: Vec<String> = err.chain().map(ToString::to_string).collect();
        assert_eq!(causes.len(), 2, "{causes:?}");
        assert!(causes[1].contains("volume in use"), "{causes:?}");
        session.close().await.expect("close");
    }
}
