//! Project model as seen by the lifecycle engine.
//!
//! Only the parts the engine needs: service names for scoping and the
//! `depends_on` edges for ordering teardown.

use serde::{Deserialize, Serialize};

use flotilla_common::error::{FlotillaError, Result};
use flotilla_common::types::ProjectName;

use crate::graph::DependencyGraph;

/// A service declared by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name.
    pub name: String,
    /// Services this one depends on.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// A named group of services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Canonical project name.
    pub name: ProjectName,
    /// Declared services.
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

impl Project {
    /// Creates a project with no services.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: ProjectName::new(name),
            services: Vec::new(),
        }
    }

    /// Adds a service with its dependencies.
    #[must_use]
    pub fn with_service<I, S>(mut self, name: impl Into<String>, depends_on: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services.push(ServiceConfig {
            name: name.into(),
            depends_on: depends_on.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Returns the names of all declared services.
    #[must_use]
    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    /// Builds the service dependency graph.
    ///
    /// # Errors
    ///
    /// Returns an error if a service depends on an undeclared service.
    pub fn dependency_graph(&self) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        for service in &self.services {
            let _ = graph.add_service(&service.name);
        }
        for service in &self.services {
            let dependent = graph.add_service(&service.name);
            for dep in &service.depends_on {
                if !self.services.iter().any(|s| &s.name == dep) {
                    return Err(FlotillaError::Config {
                        message: format!(
                            "service {} depends on undefined service {dep}",
                            service.name
                        ),
                    });
                }
                let dependency = graph.add_service(dep);
                graph.add_dependency(dependent, dependency);
            }
        }
        Ok(graph)
    }

    /// Returns service levels in teardown order: dependents before the
    /// services they depend on.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph is invalid or cyclic.
    pub fn teardown_levels(&self) -> Result<Vec<Vec<String>>> {
        let mut levels = self.dependency_graph()?.levels()?;
        levels.reverse();
        Ok(levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> Project {
        Project::new("Shop")
            .with_service("web", ["api"])
            .with_service("api", ["db"])
            .with_service("db", Vec::<String>::new())
    }

    #[test]
    fn name_is_case_folded() {
        assert_eq!(shop().name.as_str(), "shop");
    }

    #[test]
    fn service_names_in_declaration_order() {
        assert_eq!(shop().service_names(), vec!["web", "api", "db"]);
    }

    #[test]
    fn teardown_starts_with_dependents() {
        let levels = shop().teardown_levels().expect("levels");
        assert_eq!(levels, vec![vec!["web"], vec!["api"], vec!["db"]]);
    }

    #[test]
    fn undefined_dependency_is_rejected() {
        let project = Project::new("shop").with_service("web", ["cache"]);
        let err = project.dependency_graph().unwrap_err();
        assert!(err.to_string().contains("cache"));
    }

    #[test]
    fn deserializes_from_json() {
        let project: Project = serde_json::from_str(
            r#"{ "name": "Shop", "services": [ { "name": "web", "depends_on": ["db"] }, { "name": "db" } ] }"#,
        )
        .expect("deserialize");
        assert_eq!(project.name.as_str(), "shop");
        assert_eq!(project.services[1].depends_on, Vec::<String>::new());
    }
}
