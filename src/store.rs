//! In-memory resource directory.
//!
//! Nothing here is persisted; a restart starts from an empty store.

use bridge_common::{NvmeController, NvmeNamespace, NvmeSubsystem};
use std::collections::HashMap;
use uuid::Uuid;

use crate::naming;

/// Resources keyed by full name, plus pagination tokens
#[derive(Debug, Default)]
pub struct ResourceStore {
    pub subsystems: HashMap<String, NvmeSubsystem>,
    pub controllers: HashMap<String, NvmeController>,
    pub namespaces: HashMap<String, NvmeNamespace>,
    pub page_tokens: HashMap<String, usize>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live subsystem already uses `nqn`
    pub fn nqn_in_use(&self, nqn: &str) -> bool {
        self.subsystems.values().any(|s| s.spec.nqn == nqn)
    }

    /// Controllers whose names place them under `subsystem_id`, ordered by name
    pub fn controllers_of(&self, subsystem_id: &str) -> Vec<NvmeController> {
        let mut controllers: Vec<_> = self
            .controllers
            .values()
            .filter(|c| naming::parent_subsystem_id(&c.name) == Some(subsystem_id))
            .cloned()
            .collect();
        controllers.sort_by(|a, b| a.name.cmp(&b.name));
        controllers
    }

    /// Namespaces whose names place them under `subsystem_id`
    pub fn namespaces_of(&self, subsystem_id: &str) -> Vec<NvmeNamespace> {
        self.namespaces
            .values()
            .filter(|n| naming::parent_subsystem_id(&n.name) == Some(subsystem_id))
            .cloned()
            .collect()
    }

    /// Record a resume offset and return the token that refers to it
    pub fn mint_page_token(&mut self, offset: usize) -> String {
        let token = Uuid::new_v4().to_string();
        self.page_tokens.insert(token.clone(), offset);
        token
    }
}
