//! Dependency resolution over the task graph.
use super::TaskSet;
use super::graph::Dag;
use crate::error::ResolveError;
use crate::logging::Log;

/// Build the dependency graph, with an edge from every dependency to its
/// dependent.
///
/// # Errors
///
/// Returns [`ResolveError::UnknownDependency`] for the first dependency that
/// names no task.
pub fn build_graph(tasks: &TaskSet) -> Result<Dag, ResolveError> {
    let mut dag = Dag::new();
    for name in tasks.keys() {
        dag.add_node(name);
    }
    for task in tasks.values() {
        for dep in &task.depends_on {
            if !tasks.contains_key(dep) {
                return Err(ResolveError::UnknownDependency {
                    task: task.name.clone(),
                    dependency: dep.clone(),
                });
            }
            dag.add_edge(dep, &task.name);
        }
    }
    Ok(dag)
}

fn is_enabled(tasks: &TaskSet, name: &str) -> bool {
    tasks.get(name).is_some_and(|t| t.enabled)
}

fn set_enabled(tasks: &mut TaskSet, name: &str, enabled: bool) {
    if let Some(task) = tasks.get_mut(name) {
        task.enabled = enabled;
    }
}

/// Propagate enablement along dependencies, visiting tasks in topological
/// order.
///
/// With `enable_dependencies`, every enabled task enables all of its
/// transitive dependencies. Otherwise an enabled task with a disabled direct
/// dependency is disabled.
///
/// # Errors
///
/// Returns [`ResolveError::UnknownDependency`] or
/// [`ResolveError::DependencyCycle`].
pub fn resolve_dependencies(
    mut tasks: TaskSet,
    enable_dependencies: bool,
    log: &dyn Log,
) -> Result<TaskSet, ResolveError> {
    let dag = build_graph(&tasks)?;
    let order = dag
        .topological_order()
        .map_err(ResolveError::DependencyCycle)?;

    for node in order {
        if !is_enabled(&tasks, node) {
            continue;
        }
        if enable_dependencies {
            for dep in dag.ancestors(node) {
                if !is_enabled(&tasks, dep) {
                    set_enabled(&mut tasks, dep, true);
                    log.info(&format!(
                        "Enabling dependency '{dep}' because '{node}' is enabled and enable_dependencies=true"
                    ));
                }
            }
        } else {
            let disabled: Vec<&str> = dag
                .predecessors(node)
                .into_iter()
                .filter(|dep| !is_enabled(&tasks, dep))
                .collect();
            if !disabled.is_empty() {
                set_enabled(&mut tasks, node, false);
                log.warn(&format!(
                    "Task '{node}' was disabled because it depends on disabled tasks: {}",
                    disabled.join(", ")
                ));
            }
        }
    }
    log.debug("Checked task dependencies");
    Ok(tasks)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::{Level, MemoryLog};
    use crate::resolver::test_support::{enabled, set, task};

    fn disabled(mut t: crate::config::TaskDefinition) -> crate::config::TaskDefinition {
        t.enabled = false;
        t
    }

    #[test]
    fn disabled_dependency_disables_dependent() {
        let log = MemoryLog::new();
        let tasks = set([disabled(task("a", &[])), task("b", &["a"])]);
        let tasks = resolve_dependencies(tasks, false, &log).unwrap();
        assert!(enabled(&tasks).is_empty());
        assert_eq!(
            log.warnings(),
            vec!["Task 'b' was disabled because it depends on disabled tasks: a"]
        );
    }

    #[test]
    fn disablement_cascades_in_topological_order() {
        let log = MemoryLog::new();
        let tasks = set([
            task("c", &["b"]),
            task("b", &["a"]),
            disabled(task("a", &[])),
            task("d", &[]),
        ]);
        let tasks = resolve_dependencies(tasks, false, &log).unwrap();
        assert_eq!(enabled(&tasks), vec!["d"]);
        assert_eq!(log.warnings().len(), 2);
    }

    #[test]
    fn enable_dependencies_enables_all_ancestors() {
        let log = MemoryLog::new();
        let tasks = set([
            disabled(task("a", &[])),
            disabled(task("b", &["a"])),
            task("c", &["b"]),
            disabled(task("unrelated", &[])),
        ]);
        let tasks = resolve_dependencies(tasks, true, &log).unwrap();
        assert_eq!(enabled(&tasks), vec!["a", "b", "c"]);
        assert_eq!(
            log.messages(Level::Info),
            vec![
                "Enabling dependency 'a' because 'c' is enabled and enable_dependencies=true",
                "Enabling dependency 'b' because 'c' is enabled and enable_dependencies=true",
            ]
        );
    }

    #[test]
    fn enabled_dependencies_are_left_alone() {
        let log = MemoryLog::new();
        let tasks = set([task("a", &[]), task("b", &["a"])]);
        let tasks = resolve_dependencies(tasks, true, &log).unwrap();
        assert_eq!(enabled(&tasks), vec!["a", "b"]);
        assert!(log.messages(Level::Info).is_empty());
    }

    #[test]
    fn cycle_is_fatal() {
        let log = MemoryLog::new();
        let tasks = set([task("a", &["b"]), task("b", &["a"])]);
        let err = resolve_dependencies(tasks, false, &log).unwrap_err();
        let ResolveError::DependencyCycle(cycles) = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(cycles, vec![vec!["a", "b"]]);
    }

    #[test]
    fn missing_dependency_is_fatal() {
        let log = MemoryLog::new();
        let tasks = set([task("a", &["ghost"])]);
        let err = resolve_dependencies(tasks, false, &log).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Dependency 'ghost' for 'a' not found - needs to be defined in config"
        );
    }
}
