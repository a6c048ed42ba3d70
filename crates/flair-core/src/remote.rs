// ── Remote state capability ──
//
// The coordinator only needs two things from the outside world: a full
// fetch and a single-record write. `FlairClient` provides both; tests
// substitute scripted fakes.

use async_trait::async_trait;
use tracing::debug;

use flair_api::FlairClient;

use crate::command::Mutation;
use crate::error::CoreError;
use crate::model::Snapshot;

/// Fetch and mutate remote Flair state.
#[async_trait]
pub trait RemoteState: Send + Sync {
    /// Pull every structure and its devices.
    async fn get_state(&self) -> Result<Snapshot, CoreError>;

    /// Apply one mutation to a remote record.
    async fn update(&self, mutation: &Mutation) -> Result<(), CoreError>;
}

#[async_trait]
impl RemoteState for FlairClient {
    async fn get_state(&self) -> Result<Snapshot, CoreError> {
        let data = self.get_flair_data().await?;
        Ok(Snapshot::from(data))
    }

    async fn update(&self, mutation: &Mutation) -> Result<(), CoreError> {
        debug!(
            category = %mutation.category,
            device_id = %mutation.device_id,
            fields = mutation.attributes.len(),
            "sending mutation"
        );
        FlairClient::update(
            self,
            mutation.category.resource_kind(),
            &mutation.device_id,
            &mutation.attributes,
            &mutation.relationships,
        )
        .await?;
        Ok(())
    }
}

/// Names of the users and structures behind a set of credentials.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AccountInfo {
    pub client_id: String,
    pub users: Vec<String>,
    pub structures: Vec<String>,
}

/// Check that `client` can authenticate and sees at least one user and
/// one structure.
pub async fn validate_account(client: &FlairClient) -> Result<AccountInfo, CoreError> {
    let summary = client.validate().await?;
    let names = |resources: &[flair_api::Resource]| -> Vec<String> {
        resources
            .iter()
            .map(|r| r.name().unwrap_or(&r.id).to_owned())
            .collect()
    };
    Ok(AccountInfo {
        client_id: client.client_id().to_owned(),
        users: names(&summary.users),
        structures: names(&summary.structures),
    })
}
