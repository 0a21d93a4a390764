//! Command Registry

use crate::{Command, OperationMeta, OperationPlugin};
use abacus_core::{CalcError, Number};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Name to constructor mapping used for dispatch.
///
/// Names are case-sensitive. Registering a name twice replaces the earlier
/// constructor (logged), and the name keeps its original listing position.
pub struct CommandRegistry {
    operations: HashMap<String, Arc<dyn OperationPlugin>>,
    order: Vec<String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Builder form of [`register`](Self::register), keyed by the plugin's own name
    pub fn with_operation<P: OperationPlugin + 'static>(mut self, plugin: P) -> Self {
        let name = plugin.meta().name;
        self.register(name, Arc::new(plugin));
        self
    }

    /// Insert or overwrite the constructor for `name`.
    ///
    /// Returns the constructor that was replaced, if any.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        constructor: Arc<dyn OperationPlugin>,
    ) -> Option<Arc<dyn OperationPlugin>> {
        let name = name.into();
        let previous = self.operations.insert(name.clone(), constructor);
        match &previous {
            Some(old) => {
                warn!(
                    operation = %name,
                    replaced = ?old.meta().source,
                    "operation re-registered, last registration wins"
                );
            }
            None => {
                debug!(operation = %name, "operation registered");
                self.order.push(name);
            }
        }
        previous
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn OperationPlugin>> {
        self.operations.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// All registered names in registration order
    pub fn list_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Metadata of every operation, in registration order
    pub fn describe(&self) -> Vec<OperationMeta> {
        self.order
            .iter()
            .filter_map(|name| self.operations.get(name))
            .map(|op| op.meta())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look up `name` and bind the operands in one step
    pub fn construct(&self, name: &str, a: Number, b: Number) -> Result<Box<dyn Command>, CalcError> {
        match self.operations.get(name) {
            Some(op) => Ok(op.construct(a, b)),
            None => {
                let similar = self.find_similar(name);
                let mut err = CalcError::unknown_operation(name);
                if !similar.is_empty() {
                    let suggestions: Vec<&str> = similar.iter().take(3).map(|s| s.as_str()).collect();
                    err = err.with_suggestion(format!("Did you mean: {}?", suggestions.join(", ")));
                }
                Err(err)
            }
        }
    }

    /// Operation names similar to the given name (for error suggestions)
    fn find_similar(&self, name: &str) -> Vec<String> {
        let query = name.to_lowercase();
        let mut matches: Vec<(&String, usize)> = self
            .order
            .iter()
            .filter_map(|candidate| {
                let score = Self::similarity_score(&query, &candidate.to_lowercase());
                (score >= 10).then_some((candidate, score))
            })
            .collect();

        // Higher score first; ties keep registration order
        matches.sort_by(|a, b| b.1.cmp(&a.1));
        matches.into_iter().map(|(name, _)| name.clone()).collect()
    }

    fn similarity_score(query: &str, candidate: &str) -> usize {
        if query.is_empty() {
            return 0;
        }
        let mut score = 0;

        if candidate == query {
            score += 200;
        } else if candidate.starts_with(query) {
            score += 100;
        } else if candidate.contains(query) {
            score += 50;
        } else if query.contains(candidate) {
            score += 30;
        }

        let query_chars: HashSet<char> = query.chars().collect();
        let candidate_chars: HashSet<char> = candidate.chars().collect();
        let common = query_chars.intersection(&candidate_chars).count();
        let total = query_chars.union(&candidate_chars).count().max(1);
        score += common * 20 / total;

        score
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("operations", &self.order)
            .finish()
    }
}
