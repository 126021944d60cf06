//! In-memory repository forge for lifecycle tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{GithubLogin, RepositoryName, ReviewVerdict},
    ports::{CreatedRepository, ForgeError, ForgeResult, RepositoryForge},
};

#[derive(Debug, Default)]
struct ForgeState {
    repositories: HashMap<RepositoryName, CreatedRepository>,
    collaborators: HashMap<RepositoryName, HashSet<GithubLogin>>,
    comments: Vec<(RepositoryName, u64, ReviewVerdict)>,
    merged: HashSet<(RepositoryName, u64)>,
    next_repo_id: u64,
    fail_next: Option<ForgeError>,
}

/// Thread-safe in-memory forge with failure injection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryForge {
    state: Arc<RwLock<ForgeState>>,
}

impl InMemoryForge {
    /// Creates an empty forge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next operation fail with the given error.
    pub fn fail_next_operation(&self, err: ForgeError) {
        if let Ok(mut state) = self.state.write() {
            state.fail_next = Some(err);
        }
    }

    /// Returns the collaborators of a repository.
    #[must_use]
    pub fn collaborators_of(&self, name: &RepositoryName) -> Vec<GithubLogin> {
        self.state
            .read()
            .map(|state| {
                state
                    .collaborators
                    .get(name)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Returns the verdict comments posted to a pull request.
    #[must_use]
    pub fn comments_on(&self, name: &RepositoryName, number: u64) -> Vec<ReviewVerdict> {
        self.state
            .read()
            .map(|state| {
                state
                    .comments
                    .iter()
                    .filter(|(repo, pr, _)| repo == name && *pr == number)
                    .map(|(_, _, verdict)| verdict.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns true when the pull request was merged.
    #[must_use]
    pub fn is_merged(&self, name: &RepositoryName, number: u64) -> bool {
        self.state
            .read()
            .map(|state| state.merged.contains(&(name.clone(), number)))
            .unwrap_or_default()
    }

    fn locked(&self) -> ForgeResult<std::sync::RwLockWriteGuard<'_, ForgeState>> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ForgeError::Network(err.to_string()))?;
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        Ok(state)
    }
}

#[async_trait]
impl RepositoryForge for InMemoryForge {
    async fn create_repository(
        &self,
        name: &RepositoryName,
        _description: &str,
    ) -> ForgeResult<CreatedRepository> {
        let mut state = self.locked()?;
        if state.repositories.contains_key(name) {
            return Err(ForgeError::Api {
                status: 422,
                message: format!("repository {name} already exists"),
            });
        }
        state.next_repo_id += 1;
        let created = CreatedRepository {
            name: name.clone(),
            url: format!("https://github.test/gitfreelas/{name}"),
            github_repo_id: state.next_repo_id,
        };
        state.repositories.insert(name.clone(), created.clone());
        Ok(created)
    }

    async fn delete_repository(&self, name: &RepositoryName) -> ForgeResult<()> {
        let mut state = self.locked()?;
        if state.repositories.remove(name).is_none() {
            return Err(ForgeError::NotFound(name.to_string()));
        }
        state.collaborators.remove(name);
        Ok(())
    }

    async fn repository_exists(&self, name: &RepositoryName) -> ForgeResult<bool> {
        let state = self.locked()?;
        Ok(state.repositories.contains_key(name))
    }

    async fn add_collaborator(
        &self,
        name: &RepositoryName,
        login: &GithubLogin,
    ) -> ForgeResult<()> {
        let mut state = self.locked()?;
        if !state.repositories.contains_key(name) {
            return Err(ForgeError::NotFound(name.to_string()));
        }
        state
            .collaborators
            .entry(name.clone())
            .or_default()
            .insert(login.clone());
        Ok(())
    }

    async fn remove_collaborator(
        &self,
        name: &RepositoryName,
        login: &GithubLogin,
    ) -> ForgeResult<()> {
        let mut state = self.locked()?;
        let Some(collaborators) = state.collaborators.get_mut(name) else {
            return Err(ForgeError::NotFound(name.to_string()));
        };
        collaborators.remove(login);
        Ok(())
    }

    async fn post_review_comment(
        &self,
        name: &RepositoryName,
        pull_request_number: u64,
        verdict: &ReviewVerdict,
    ) -> ForgeResult<()> {
        let mut state = self.locked()?;
        if !state.repositories.contains_key(name) {
            return Err(ForgeError::NotFound(name.to_string()));
        }
        state
            .comments
            .push((name.clone(), pull_request_number, verdict.clone()));
        Ok(())
    }

    async fn merge_pull_request(
        &self,
        name: &RepositoryName,
        pull_request_number: u64,
    ) -> ForgeResult<()> {
        let mut state = self.locked()?;
        if !state.repositories.contains_key(name) {
            return Err(ForgeError::NotFound(name.to_string()));
        }
        state.merged.insert((name.clone(), pull_request_number));
        Ok(())
    }

    async fn transfer_access(
        &self,
        name: &RepositoryName,
        from: &GithubLogin,
        to: &GithubLogin,
    ) -> ForgeResult<()> {
        let mut state = self.locked()?;
        let Some(collaborators) = state.collaborators.get_mut(name) else {
            return Err(ForgeError::NotFound(name.to_string()));
        };
        collaborators.remove(from);
        collaborators.insert(to.clone());
        Ok(())
    }

    async fn verify_connection(&self) -> ForgeResult<String> {
        let _state = self.locked()?;
        Ok("gitfreelas-test".to_owned())
    }
}
