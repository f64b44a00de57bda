//! Field ordering from expression and explicit dependencies.
//!
//! A field depends on every field named in its `dependsOn` lists and on the
//! fields its expression reads: bare `${name}` references and the first
//! argument of a field-referencing function inside a reference. The graph is
//! rebuilt on every call.

use std::collections::{BTreeMap, BTreeSet};

use fieldsmith_core::FieldSpec;
use fieldsmith_expr::parser::extract_field_references;
use tracing::{debug, warn};

use crate::errors::DependencyError;
use crate::generators::DEPENDENT_EXPRESSION_KEY;

/// Adjacency map from field name to the names it reads from.
pub type DependencyGraph = BTreeMap<String, BTreeSet<String>>;

/// Order fields so every field follows the fields it depends on.
///
/// References to fields outside the schema are ignored with a warning. On a
/// cycle the declaration order is returned unchanged.
pub fn resolve_order(fields: &[FieldSpec]) -> Vec<FieldSpec> {
    let graph = build_graph(fields, true);
    match topological_order(fields, &graph) {
        Ok(order) => {
            let by_name: BTreeMap<&str, &FieldSpec> =
                fields.iter().map(|field| (field.name.as_str(), field)).collect();
            let ordered: Vec<FieldSpec> = order
                .iter()
                .filter_map(|name| by_name.get(name.as_str()).map(|field| (*field).clone()))
                .collect();
            debug!(order = ?order, "dependency order resolved");
            ordered
        }
        Err(DependencyError::Cycle { field, path }) => {
            warn!(
                field = %field,
                cycle = %path.join(" -> "),
                "circular dependency detected; using declaration order"
            );
            fields.to_vec()
        }
    }
}

/// Strict variant of [`resolve_order`] that fails on the first cycle found.
pub fn validate_no_cycles(fields: &[FieldSpec]) -> Result<(), DependencyError> {
    let graph = build_graph(fields, false);
    topological_order(fields, &graph).map(|_| ())
}

/// Dependency graph restricted to fields present in the schema.
pub fn dependency_graph(fields: &[FieldSpec]) -> DependencyGraph {
    build_graph(fields, false)
}

/// Human-readable listing of each field's dependencies, in declaration order.
pub fn render_dependency_graph(fields: &[FieldSpec]) -> String {
    let graph = dependency_graph(fields);
    let mut out = String::from("Field Dependencies:\n==================\n");
    for field in fields {
        out.push_str(&field.name);
        match graph.get(&field.name) {
            Some(deps) if !deps.is_empty() => {
                out.push_str(" -> ");
                out.push_str(&deps.iter().cloned().collect::<Vec<_>>().join(", "));
            }
            _ => out.push_str(" -> [no dependencies]"),
        }
        out.push('\n');
    }
    out
}

/// Sorted names of fields without dependencies.
pub fn independent_fields(fields: &[FieldSpec]) -> Vec<String> {
    dependency_graph(fields)
        .into_iter()
        .filter(|(_, deps)| deps.is_empty())
        .map(|(name, _)| name)
        .collect()
}

/// Sorted names of fields that read `target` directly.
pub fn fields_depending_on(fields: &[FieldSpec], target: &str) -> Vec<String> {
    dependency_graph(fields)
        .into_iter()
        .filter(|(_, deps)| deps.contains(target))
        .map(|(name, _)| name)
        .collect()
}

/// Returns true when `field` reads `dependency` directly or transitively.
pub fn field_depends_on(fields: &[FieldSpec], field: &str, dependency: &str) -> bool {
    let graph = dependency_graph(fields);
    let mut seen = BTreeSet::new();
    let mut pending = vec![field];
    while let Some(current) = pending.pop() {
        if !seen.insert(current) {
            continue;
        }
        if let Some(deps) = graph.get(current) {
            if deps.contains(dependency) {
                return true;
            }
            pending.extend(deps.iter().map(String::as_str));
        }
    }
    false
}

/// Direct dependencies of one field as written, including unknown names.
pub fn declared_dependencies(field: &FieldSpec) -> BTreeSet<String> {
    let options = field.parsed_options();
    let mut deps: BTreeSet<String> = options
        .declared_dependencies()
        .into_iter()
        .map(str::to_string)
        .collect();

    if let Some(expression) = options.expression() {
        deps.extend(extract_field_references(expression));
    }

    let generator_key = options.base_type.as_deref().unwrap_or(&field.generator_key);
    if generator_key == DEPENDENT_EXPRESSION_KEY {
        if let Some(expression) = options.base_options_text() {
            deps.extend(extract_field_references(&expression));
        }
    }
    deps
}

fn build_graph(fields: &[FieldSpec], log_missing: bool) -> DependencyGraph {
    let names: BTreeSet<&str> = fields.iter().map(|field| field.name.as_str()).collect();
    let mut graph = DependencyGraph::new();

    for field in fields {
        let mut internal = BTreeSet::new();
        for dependency in declared_dependencies(field) {
            if names.contains(dependency.as_str()) {
                internal.insert(dependency);
            } else if log_missing {
                warn!(
                    field = %field.name,
                    dependency = %dependency,
                    "dependency not present in schema; ignored"
                );
            }
        }
        graph.entry(field.name.clone()).or_default().extend(internal);
    }
    graph
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Iterative three-color depth-first topological sort in declaration order.
fn topological_order(
    fields: &[FieldSpec],
    graph: &DependencyGraph,
) -> Result<Vec<String>, DependencyError> {
    let empty = BTreeSet::new();
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    let mut order = Vec::with_capacity(fields.len());

    for root in fields {
        let root = root.name.as_str();
        if marks.contains_key(root) {
            continue;
        }

        let mut stack: Vec<(&str, Vec<&str>)> = Vec::new();
        marks.insert(root, Mark::Visiting);
        stack.push((root, pending_deps(graph, root, &empty)));

        while let Some((current, pending)) = stack.last_mut() {
            let current = *current;
            let Some(next) = pending.pop() else {
                marks.insert(current, Mark::Done);
                order.push(current.to_string());
                stack.pop();
                continue;
            };

            match marks.get(next) {
                Some(Mark::Done) => {}
                Some(Mark::Visiting) => {
                    let start = stack
                        .iter()
                        .position(|(name, _)| *name == next)
                        .unwrap_or(0);
                    let mut path: Vec<String> =
                        stack[start..].iter().map(|(name, _)| name.to_string()).collect();
                    path.push(next.to_string());
                    return Err(DependencyError::Cycle {
                        field: next.to_string(),
                        path,
                    });
                }
                None => {
                    marks.insert(next, Mark::Visiting);
                    stack.push((next, pending_deps(graph, next, &empty)));
                }
            }
        }
    }

    Ok(order)
}

/// Dependencies in reverse sorted order, so popping visits them ascending.
fn pending_deps<'a>(
    graph: &'a DependencyGraph,
    name: &str,
    empty: &'a BTreeSet<String>,
) -> Vec<&'a str> {
    graph
        .get(name)
        .unwrap_or(empty)
        .iter()
        .rev()
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsmith_core::FieldOptions;

    fn plain(name: &str) -> FieldSpec {
        FieldSpec::new(name, "Name.firstName")
    }

    fn derived(name: &str, expression: &str) -> FieldSpec {
        FieldSpec::new(name, "Dependent.expression").with_expression(expression)
    }

    fn names(fields: &[FieldSpec]) -> Vec<&str> {
        fields.iter().map(|field| field.name.as_str()).collect()
    }

    #[test]
    fn dependencies_come_first() {
        let fields = vec![
            derived("email", "${lowercase(first)}.${lowercase(last)}@example.com"),
            derived("initials", "${substring(first, 0, 1)}${substring(last, 0, 1)}"),
            plain("first"),
            plain("last"),
        ];
        let ordered = resolve_order(&fields);
        assert_eq!(names(&ordered), vec!["first", "last", "email", "initials"]);
    }

    #[test]
    fn explicit_depends_on_and_nested_block_count() {
        let nested = FieldSpec::new("b", "Name.lastName").with_raw_options(
            r#"{"dependency": {"expression": "x", "dependsOn": ["c"]}}"#,
        );
        let top = FieldSpec::new("a", "Name.lastName").with_options(FieldOptions {
            depends_on: vec!["b".to_string()],
            ..FieldOptions::default()
        });
        let fields = vec![top, nested, plain("c")];
        assert_eq!(names(&resolve_order(&fields)), vec!["c", "b", "a"]);
    }

    #[test]
    fn cycles_fall_back_to_declaration_order() {
        let fields = vec![
            derived("a", "${b}"),
            derived("b", "${c}"),
            derived("c", "${a}"),
            plain("d"),
        ];
        assert_eq!(names(&resolve_order(&fields)), vec!["a", "b", "c", "d"]);

        let err = validate_no_cycles(&fields).expect_err("cycle");
        let DependencyError::Cycle { field, path } = err;
        assert_eq!(field, "a");
        assert_eq!(path, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let fields = vec![derived("a", "${a}!")];
        assert!(validate_no_cycles(&fields).is_err());
        assert_eq!(names(&resolve_order(&fields)), vec!["a"]);
    }

    #[test]
    fn unknown_references_add_no_edges() {
        let fields = vec![derived("a", "${ghost}-${b}"), plain("b")];
        assert_eq!(names(&resolve_order(&fields)), vec!["b", "a"]);
        assert!(validate_no_cycles(&fields).is_ok());
        assert_eq!(dependency_graph(&fields)["a"], BTreeSet::from(["b".to_string()]));
    }

    #[test]
    fn non_field_functions_do_not_create_edges() {
        let fields = vec![derived("a", "${randomChoice(b, c)}"), plain("b")];
        assert!(dependency_graph(&fields)["a"].is_empty());
    }

    #[test]
    fn dependent_generator_options_are_expressions() {
        let dependent = FieldSpec::new("full", DEPENDENT_EXPRESSION_KEY).with_raw_options("${first} ${last}");
        let fields = vec![dependent, plain("first"), plain("last")];
        assert_eq!(names(&resolve_order(&fields)), vec!["first", "last", "full"]);
    }

    #[test]
    fn graph_queries() {
        let fields = vec![
            plain("first"),
            derived("upper", "${uppercase(first)}"),
            derived("tag", "${upper}-${first}"),
        ];

        assert_eq!(
            render_dependency_graph(&fields),
            "Field Dependencies:\n==================\nfirst -> [no dependencies]\nupper -> first\ntag -> first, upper\n"
        );
        assert_eq!(independent_fields(&fields), vec!["first"]);
        assert_eq!(fields_depending_on(&fields, "first"), vec!["tag", "upper"]);
        assert!(field_depends_on(&fields, "tag", "first"));
        assert!(!field_depends_on(&fields, "first", "tag"));
    }
}
