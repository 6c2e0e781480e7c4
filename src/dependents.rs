//! Upgrading installed dependents left outdated by a reinstall.

use crate::backend::{Backend, ReinstallOptions};
use crate::closure::{Walk, walk_dependencies};
use crate::config::Config;
use crate::error::Result;
use crate::formula::{Package, Registry};
use colored::Colorize;
use std::collections::HashSet;

/// Outdated dependents of the reinstalled formulae, split by pin state
#[derive(Debug)]
pub struct DependentPlan<'a, P> {
    pub upgrade: Vec<&'a P>,
    pub pinned: Vec<&'a P>,
}

impl<P> DependentPlan<'_, P> {
    pub fn is_empty(&self) -> bool {
        self.upgrade.is_empty() && self.pinned.is_empty()
    }
}

/// Find installed, outdated packages that depend on any of `targets`,
/// directly or through other formulae. Targets themselves are never part of
/// the plan.
pub fn plan<'a, R: Registry>(registry: &'a R, targets: &[&str]) -> DependentPlan<'a, R::Package> {
    let targets: HashSet<&str> = targets.iter().copied().collect();
    let mut upgrade = Vec::new();
    let mut pinned = Vec::new();

    for package in registry.installed() {
        if targets.contains(package.name()) || !package.is_outdated() {
            continue;
        }

        let depends_on_target = walk_dependencies(registry, package, |_| Walk::Descend)
            .iter()
            .any(|dep| targets.contains(dep.name()));
        if !depends_on_target {
            continue;
        }

        if package.is_pinned() {
            pinned.push(package);
        } else {
            upgrade.push(package);
        }
    }

    DependentPlan { upgrade, pinned }
}

/// Upgrade the outdated dependents of `targets` in one backend call.
///
/// Returns the names handed to the backend.
pub fn run_dependent_pass<R, B>(
    registry: &R,
    backend: &B,
    targets: &[&str],
    options: &ReinstallOptions,
    config: &Config,
) -> Result<Vec<String>>
where
    R: Registry,
    B: Backend,
{
    if config.no_installed_dependents_check {
        tracing::debug!("Installed dependents check disabled");
        return Ok(vec![]);
    }

    let plan = plan(registry, targets);
    if plan.is_empty() {
        return Ok(vec![]);
    }

    if !plan.pinned.is_empty() {
        let names: Vec<&str> = plan.pinned.iter().map(|p| p.name()).collect();
        println!(
            "{} Not upgrading {} pinned dependent{}: {}",
            "⚠".yellow(),
            names.len(),
            if names.len() == 1 { "" } else { "s" },
            names.join(", ")
        );
    }

    if plan.upgrade.is_empty() {
        return Ok(vec![]);
    }

    let names: Vec<String> = plan.upgrade.iter().map(|p| p.name().to_string()).collect();
    println!(
        "{} Upgrading {} dependent{} of reinstalled formulae: {}",
        "==>".blue().bold(),
        names.len(),
        if names.len() == 1 { "" } else { "s" },
        names.join(", ").cyan()
    );
    backend.upgrade_dependents(&names, options)?;

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cellar::Keg;
    use crate::formula::{Formula, Formulary};
    use std::path::PathBuf;

    fn installed(name: &str) -> Formula {
        Formula::new(name).with_keg(Keg::new(name, "1.0", PathBuf::from(format!("/tmp/{name}"))))
    }

    fn names<P: Package>(packages: &[&P]) -> Vec<String> {
        packages.iter().map(|p| p.name().to_string()).collect()
    }

    #[test]
    fn test_plan_finds_transitive_outdated_dependents() {
        let mut formulary = Formulary::new();
        formulary.insert(installed("openssl@3"));
        formulary.insert(installed("curl").with_dependencies(["openssl@3"]).outdated(true));
        formulary.insert(installed("git").with_dependencies(["curl"]).outdated(true));
        formulary.insert(installed("wget").with_dependencies(["openssl@3"]));
        formulary.insert(
            installed("node")
                .with_dependencies(["openssl@3"])
                .outdated(true)
                .pinned(true),
        );
        formulary.insert(installed("jq").outdated(true));

        let plan = plan(&formulary, &["openssl@3"]);
        assert_eq!(names(&plan.upgrade), vec!["curl", "git"]);
        assert_eq!(names(&plan.pinned), vec!["node"]);
    }

    #[test]
    fn test_plan_excludes_targets() {
        let mut formulary = Formulary::new();
        formulary.insert(installed("a").outdated(true));
        formulary.insert(installed("b").with_dependencies(["a"]).outdated(true));

        let plan = plan(&formulary, &["a", "b"]);
        assert!(plan.is_empty());
    }
}
