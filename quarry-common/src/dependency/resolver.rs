// quarry-common/src/dependency/resolver.rs
//
// Breadth-first dependency graph expansion with constraint intersection.
// Every edge target resolves to exactly one spec per graph; conflicting
// constraints on a target are an error, never a silent pick. A later edge
// may tighten the constraint on an already-chosen target, in which case the
// whole expansion restarts with the accumulated (strictly tighter)
// constraint set. Constraints only ever tighten and the reachable edge set
// is fixed by the variant assignment, so the restart loop terminates.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use tracing::debug;

use crate::dependency::definition::DependencyEdge;
use crate::error::{QuarryError, Result};
use crate::model::recipe::Recipe;
use crate::model::spec::{ResolvedSpec, Toolchain};
use crate::model::variant::{self, VariantValue};
use crate::model::version::{Version, VersionConstraint};
use crate::registry::RecipeRegistry;

/// Accumulated constraint on one target, with the edges that shaped it.
#[derive(Debug, Clone)]
struct ConstraintSet {
    constraint: VersionConstraint,
    sources: Vec<String>,
}

impl ConstraintSet {
    fn unconstrained() -> Self {
        Self {
            constraint: VersionConstraint::Any,
            sources: Vec::new(),
        }
    }
}

enum Expansion {
    Complete(ResolvedGraph),
    Tightened { target: String },
}

/// The acyclic result of one resolution request: a spec per reachable
/// recipe name plus the active edges between them. Built fresh per request
/// and discarded after install orchestration completes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGraph {
    root: String,
    nodes: BTreeMap<String, ResolvedSpec>,
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl ResolvedGraph {
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedSpec> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ResolvedSpec> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct dependencies of a node, in name order.
    pub fn dependencies_of(&self, name: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(name)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    /// Direct dependents of a node, in name order.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.contains(name))
            .map(|(from, _)| from.as_str())
            .collect()
    }

    /// Deterministic topological order, dependencies first.
    pub fn install_order(&self) -> Vec<String> {
        let mut remaining: BTreeMap<&str, usize> = self
            .nodes
            .keys()
            .map(|name| {
                (
                    name.as_str(),
                    self.edges.get(name).map_or(0, |deps| deps.len()),
                )
            })
            .collect();
        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(&name) = ready.iter().next() {
            ready.remove(name);
            order.push(name.to_string());
            for dependent in self.dependents_of(name) {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        debug_assert_eq!(
            order.len(),
            self.nodes.len(),
            "resolved graph contained a cycle"
        );
        order
    }
}

pub struct Resolver<'a> {
    registry: &'a RecipeRegistry,
    toolchain: Toolchain,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a RecipeRegistry, toolchain: Toolchain) -> Self {
        Self {
            registry,
            toolchain,
        }
    }

    pub fn resolve(
        &self,
        root: &str,
        overrides: &BTreeMap<String, VariantValue>,
    ) -> Result<ResolvedGraph> {
        self.resolve_pinned(root, VersionConstraint::Any, overrides)
    }

    /// Resolve with a version constraint on the root itself (`name@1.2`).
    pub fn resolve_pinned(
        &self,
        root: &str,
        root_constraint: VersionConstraint,
        overrides: &BTreeMap<String, VariantValue>,
    ) -> Result<ResolvedGraph> {
        let root_recipe = self.registry.get(root)?;
        let root_variants = variant::validate_overrides(&root_recipe, overrides)?;

        let mut accumulated: HashMap<String, ConstraintSet> = HashMap::new();
        accumulated.insert(
            root.to_string(),
            ConstraintSet {
                constraint: root_constraint.clone(),
                sources: vec![format!("requested {root} {root_constraint}")],
            },
        );

        let mut pass = 0usize;
        loop {
            pass += 1;
            match self.expand(root, &root_variants, &mut accumulated)? {
                Expansion::Complete(graph) => {
                    debug!(
                        "Resolved '{}' to {} specs in {} pass(es)",
                        root,
                        graph.len(),
                        pass
                    );
                    return Ok(graph);
                }
                Expansion::Tightened { target } => {
                    debug!(
                        "Resolution pass {pass}: constraint on '{target}' tightened, re-resolving"
                    );
                }
            }
        }
    }

    fn expand(
        &self,
        root: &str,
        root_variants: &BTreeMap<String, VariantValue>,
        accumulated: &mut HashMap<String, ConstraintSet>,
    ) -> Result<Expansion> {
        let mut nodes: BTreeMap<String, ResolvedSpec> = BTreeMap::new();
        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        let root_spec = self.instantiate(root, Some(root_variants), accumulated)?;
        nodes.insert(root.to_string(), root_spec);
        edges.insert(root.to_string(), BTreeSet::new());
        queue.push_back(root.to_string());

        while let Some(name) = queue.pop_front() {
            let spec = nodes.get(&name).expect("queued node is instantiated").clone();

            for edge in &spec.recipe.dependencies {
                if let Some(condition) = &edge.when {
                    if !condition.eval(&spec) {
                        debug!("Edge '{name} -> {}' inactive for {spec}", edge.target);
                        continue;
                    }
                }

                let edge_desc = format!("{name} -> {edge}");
                self.merge_constraint(accumulated, edge, &edge_desc)?;
                self.check_cycle(&edges, &name, edge, &edge_desc)?;

                edges.entry(name.clone()).or_default().insert(edge.target.clone());
                edges.entry(edge.target.clone()).or_default();

                let acc = accumulated
                    .get(&edge.target)
                    .expect("constraint merged above");
                if let Some(existing) = nodes.get(&edge.target) {
                    let recipe = self.registry.get(&edge.target)?;
                    let desired = self.select_version(&recipe, acc)?;
                    if existing.version != desired {
                        // The constraint tightened past the chosen version;
                        // the caller restarts expansion with the accumulated
                        // set, which re-resolves this subtree.
                        return Ok(Expansion::Tightened {
                            target: edge.target.clone(),
                        });
                    }
                } else {
                    let dep_spec = self.instantiate(&edge.target, None, accumulated)?;
                    nodes.insert(edge.target.clone(), dep_spec);
                    queue.push_back(edge.target.clone());
                }
            }
        }

        Ok(Expansion::Complete(ResolvedGraph {
            root: root.to_string(),
            nodes,
            edges,
        }))
    }

    fn merge_constraint(
        &self,
        accumulated: &mut HashMap<String, ConstraintSet>,
        edge: &DependencyEdge,
        edge_desc: &str,
    ) -> Result<()> {
        let entry = accumulated
            .entry(edge.target.clone())
            .or_insert_with(ConstraintSet::unconstrained);
        match entry.constraint.intersect(&edge.constraint) {
            Some(merged) => {
                entry.constraint = merged;
                if !entry.sources.iter().any(|s| s == edge_desc) {
                    entry.sources.push(edge_desc.to_string());
                }
                Ok(())
            }
            None => Err(QuarryError::UnsatisfiableConstraint {
                target: edge.target.clone(),
                first: entry
                    .sources
                    .last()
                    .cloned()
                    .unwrap_or_else(|| format!("requested {}", edge.target)),
                second: edge_desc.to_string(),
            }),
        }
    }

    fn check_cycle(
        &self,
        edges: &BTreeMap<String, BTreeSet<String>>,
        declarer: &str,
        edge: &DependencyEdge,
        edge_desc: &str,
    ) -> Result<()> {
        if edge.target == declarer {
            return Err(QuarryError::CyclicDependency {
                chain: format!("{declarer} -> {declarer}"),
                first_edge: edge_desc.to_string(),
                second_edge: edge_desc.to_string(),
            });
        }
        if let Some(path) = find_path(edges, &edge.target, declarer) {
            let mut chain = path.clone();
            chain.push(edge.target.clone());
            return Err(QuarryError::CyclicDependency {
                chain: chain.join(" -> "),
                first_edge: format!("{} -> {}", path[0], path[1]),
                second_edge: format!("{declarer} -> {}", edge.target),
            });
        }
        Ok(())
    }

    fn instantiate(
        &self,
        name: &str,
        explicit_variants: Option<&BTreeMap<String, VariantValue>>,
        accumulated: &HashMap<String, ConstraintSet>,
    ) -> Result<ResolvedSpec> {
        let recipe = self.registry.get(name)?;
        let constraints = accumulated.get(name);
        let version = match constraints {
            Some(acc) => self.select_version(&recipe, acc)?,
            None => self
                .select_version_by(&recipe, &VersionConstraint::Any)
                .expect("validated recipes declare at least one version"),
        };
        let variants = match explicit_variants {
            Some(explicit) => explicit.clone(),
            None => variant::validate_overrides(&recipe, &BTreeMap::new())?,
        };
        Ok(ResolvedSpec {
            recipe,
            version,
            variants,
            toolchain: self.toolchain.clone(),
        })
    }

    fn select_version(
        &self,
        recipe: &Recipe,
        constraints: &ConstraintSet,
    ) -> Result<Version> {
        self.select_version_by(recipe, &constraints.constraint)
            .ok_or_else(|| QuarryError::UnsatisfiableConstraint {
                target: recipe.name.clone(),
                first: constraints
                    .sources
                    .first()
                    .cloned()
                    .unwrap_or_else(|| format!("requested {}", recipe.name)),
                second: constraints
                    .sources
                    .last()
                    .cloned()
                    .unwrap_or_else(|| format!("requested {}", recipe.name)),
            })
    }

    /// Version selection policy: an exact pin wins outright; a constraint
    /// with a floor takes the lowest declared version satisfying it, which
    /// maximizes room for constraints visited later; otherwise the highest
    /// satisfying version is preferred.
    fn select_version_by(
        &self,
        recipe: &Recipe,
        constraint: &VersionConstraint,
    ) -> Option<Version> {
        match constraint {
            VersionConstraint::Exact(pin) => recipe.has_version(pin).then(|| pin.clone()),
            c if c.floor().is_some() => recipe
                .versions
                .iter()
                .map(|e| &e.version)
                .filter(|v| c.satisfies(v))
                .min()
                .cloned(),
            c => recipe
                .versions
                .iter()
                .map(|e| &e.version)
                .filter(|v| c.satisfies(v))
                .max()
                .cloned(),
        }
    }
}

/// Node path `from -> ... -> to` over the accumulated edges, if one exists.
fn find_path(
    edges: &BTreeMap<String, BTreeSet<String>>,
    from: &str,
    to: &str,
) -> Option<Vec<String>> {
    fn dfs(
        edges: &BTreeMap<String, BTreeSet<String>>,
        current: &str,
        to: &str,
        visited: &mut BTreeSet<String>,
        path: &mut Vec<String>,
    ) -> bool {
        path.push(current.to_string());
        if current == to {
            return true;
        }
        if let Some(next) = edges.get(current) {
            for candidate in next {
                if visited.insert(candidate.clone())
                    && dfs(edges, candidate, to, visited, path)
                {
                    return true;
                }
            }
        }
        path.pop();
        false
    }

    let mut visited = BTreeSet::new();
    visited.insert(from.to_string());
    let mut path = Vec::new();
    dfs(edges, from, to, &mut visited, &mut path).then_some(path)
}
