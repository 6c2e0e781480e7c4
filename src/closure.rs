//! Dependency closure used for size estimates before a reinstall.
//!
//! [`walk_dependencies`] is the generic pruned graph walk; [`build_closure`]
//! applies the reinstall pruning rules and the installed-dependents scan and
//! returns a deduplicated [`SizedSet`].

use crate::formula::{Package, Registry};
use std::collections::HashSet;

/// Decision taken for each dependency reached by the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Exclude the dependency and do not look at its own dependencies
    Prune,
    /// Include the dependency and walk into it
    Descend,
}

/// Walk the dependency graph below `root`.
///
/// Every reachable dependency is shown to `prune` once. Pruned nodes are
/// excluded along with everything only reachable through them. The result is
/// in post-order: a node's surviving dependencies come before the node.
/// Dependencies the registry does not know are skipped.
pub fn walk_dependencies<'a, R, F>(
    registry: &'a R,
    root: &R::Package,
    mut prune: F,
) -> Vec<&'a R::Package>
where
    R: Registry,
    F: FnMut(&R::Package) -> Walk,
{
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(root.name().to_string());

    let mut result = Vec::new();
    walk_into(registry, root.dependencies(), &mut prune, &mut visited, &mut result);
    result
}

fn walk_into<'a, R, F>(
    registry: &'a R,
    dependencies: &[String],
    prune: &mut F,
    visited: &mut HashSet<String>,
    result: &mut Vec<&'a R::Package>,
) where
    R: Registry,
    F: FnMut(&R::Package) -> Walk,
{
    for dep_name in dependencies {
        let Some(dep) = registry.get(dep_name) else {
            tracing::debug!("Dependency {} is not known, skipping", dep_name);
            continue;
        };
        if !visited.insert(dep.name().to_string()) {
            continue;
        }
        if prune(dep) == Walk::Prune {
            continue;
        }
        walk_into(registry, dep.dependencies(), prune, visited, result);
        result.push(dep);
    }
}

/// Pruning rule for the reinstall closure: only outdated, bottled packages
/// that have dependencies of their own are kept.
pub fn reinstall_prune<P: Package>(dep: &P) -> Walk {
    if dep.dependencies().is_empty() || !dep.is_outdated() || !dep.is_bottled() {
        Walk::Prune
    } else {
        Walk::Descend
    }
}

/// Ordered set of packages, unique by name
#[derive(Debug)]
pub struct SizedSet<'a, P> {
    members: Vec<&'a P>,
}

impl<'a, P: Package> SizedSet<'a, P> {
    /// Deduplicate by name, keeping the first occurrence
    pub fn from_packages(packages: impl IntoIterator<Item = &'a P>) -> Self {
        let mut seen = HashSet::new();
        let members = packages
            .into_iter()
            .filter(|p| seen.insert(p.name().to_string()))
            .collect();
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|p| p.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a P> + '_ {
        self.members.iter().copied()
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|p| p.name()).collect()
    }
}

/// Compute the packages a reinstall of `targets` affects.
///
/// Targets are always members. With `check_dependents`, each target's pruned
/// dependency walk is added, then every installed package that directly
/// depends on something in the closure and is itself outdated.
pub fn build_closure<'a, R: Registry>(
    registry: &'a R,
    targets: &[&'a R::Package],
    check_dependents: bool,
) -> SizedSet<'a, R::Package> {
    let mut packages: Vec<&'a R::Package> = Vec::new();

    for &target in targets {
        packages.push(target);
        if check_dependents && !target.dependencies().is_empty() {
            packages.extend(walk_dependencies(
                registry,
                target,
                reinstall_prune::<R::Package>,
            ));
        }
    }

    if check_dependents {
        let closure_names: HashSet<&str> = packages.iter().map(|p| p.name()).collect();
        let dependents: Vec<_> = registry
            .installed()
            .into_iter()
            .filter(|installed| {
                installed.is_outdated()
                    && installed
                        .dependencies()
                        .iter()
                        .any(|d| closure_names.contains(crate::cellar::short_name(d)))
            })
            .collect();
        packages.extend(dependents);
    }

    SizedSet::from_packages(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cellar::Keg;
    use crate::formula::{BottleRef, Formula, Formulary};
    use std::path::PathBuf;

    fn bottle(name: &str) -> BottleRef {
        BottleRef::new(name, "1.0", 0, "all", None)
    }

    fn installed(name: &str) -> Formula {
        let path = PathBuf::from(format!("/tmp/Cellar/{name}/0.9"));
        Formula::new(name).with_keg(Keg::new(name, "0.9", path))
    }

    fn registry(formulae: Vec<Formula>) -> Formulary {
        let mut formulary = Formulary::new();
        for formula in formulae {
            formulary.insert(formula);
        }
        formulary
    }

    fn names<P: Package>(set: &SizedSet<'_, P>) -> Vec<String> {
        set.names().into_iter().map(String::from).collect()
    }

    #[test]
    fn test_no_dependencies_gives_target_only() {
        let reg = registry(vec![installed("a")]);
        let a = reg.get("a").unwrap();
        let set = build_closure(&reg, &[a], true);
        assert_eq!(names(&set), vec!["a"]);
    }

    #[test]
    fn test_outdated_bottled_dependency_with_deps_is_kept() {
        let reg = registry(vec![
            installed("b").with_dependencies(["c", "d"]),
            installed("c")
                .with_dependencies(["e"])
                .outdated(true)
                .with_bottle(bottle("c")),
            installed("d").with_dependencies(["e"]).with_bottle(bottle("d")),
            installed("e"),
        ]);
        let b = reg.get("b").unwrap();
        let set = build_closure(&reg, &[b], true);
        assert_eq!(names(&set), vec!["b", "c"]);
    }

    #[test]
    fn test_prune_reasons() {
        // leaf, not bottled, not outdated
        let reg = registry(vec![
            installed("root").with_dependencies(["leaf", "source-only", "current"]),
            installed("leaf").outdated(true).with_bottle(bottle("leaf")),
            installed("source-only").with_dependencies(["x"]).outdated(true),
            installed("current").with_dependencies(["x"]).with_bottle(bottle("current")),
            installed("x"),
        ]);
        let root = reg.get("root").unwrap();
        let set = build_closure(&reg, &[root], true);
        assert_eq!(names(&set), vec!["root"]);
    }

    #[test]
    fn test_walk_is_post_order_and_descends_survivors() {
        let reg = registry(vec![
            installed("app").with_dependencies(["mid"]),
            installed("mid")
                .with_dependencies(["low"])
                .outdated(true)
                .with_bottle(bottle("mid")),
            installed("low")
                .with_dependencies(["leaf"])
                .outdated(true)
                .with_bottle(bottle("low")),
            installed("leaf"),
        ]);
        let app = reg.get("app").unwrap();
        let walked: Vec<_> = walk_dependencies(&reg, app, reinstall_prune::<Formula>)
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(walked, vec!["low", "mid"]);
    }

    #[test]
    fn test_walk_terminates_on_cycles() {
        let reg = registry(vec![
            installed("a").with_dependencies(["b"]),
            installed("b").with_dependencies(["a"]),
        ]);
        let a = reg.get("a").unwrap();
        let walked = walk_dependencies(&reg, a, |_| Walk::Descend);
        let walked: Vec<_> = walked.iter().map(|p| p.name()).collect();
        assert_eq!(walked, vec!["b"]);
    }

    #[test]
    fn test_unknown_dependencies_are_skipped() {
        let reg = registry(vec![installed("a").with_dependencies(["ghost"])]);
        let a = reg.get("a").unwrap();
        assert!(walk_dependencies(&reg, a, |_| Walk::Descend).is_empty());
    }

    #[test]
    fn test_installed_outdated_dependents_are_appended() {
        let reg = registry(vec![
            installed("lib"),
            installed("user").with_dependencies(["lib"]).outdated(true),
            installed("fresh-user").with_dependencies(["lib"]),
            installed("unrelated").outdated(true),
        ]);
        let lib = reg.get("lib").unwrap();
        let set = build_closure(&reg, &[lib], true);
        assert_eq!(names(&set), vec!["lib", "user"]);
    }

    #[test]
    fn test_check_dependents_disabled_is_dedup_of_targets() {
        let reg = registry(vec![
            installed("lib").with_dependencies(["dep"]),
            installed("dep")
                .with_dependencies(["x"])
                .outdated(true)
                .with_bottle(bottle("dep")),
            installed("x"),
            installed("user").with_dependencies(["lib"]).outdated(true),
        ]);
        let lib = reg.get("lib").unwrap();
        let set = build_closure(&reg, &[lib, lib], false);
        assert_eq!(names(&set), vec!["lib"]);
    }

    #[test]
    fn test_targets_always_members_and_unique() {
        let reg = registry(vec![
            installed("a").with_dependencies(["b"]),
            installed("b")
                .with_dependencies(["c"])
                .outdated(true)
                .with_bottle(bottle("b")),
            installed("c"),
        ]);
        let a = reg.get("a").unwrap();
        let b = reg.get("b").unwrap();
        let set = build_closure(&reg, &[a, b, a], true);
        assert!(set.contains("a") && set.contains("b"));
        let unique: HashSet<&str> = set.names().into_iter().collect();
        assert_eq!(unique.len(), set.len());
        assert_eq!(names(&set), vec!["a", "b"]);
    }
}
