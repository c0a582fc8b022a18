use crate::metadata::Environment;
use crate::request::ChangeRequest;

use super::pool::Pool;
use super::rule::{Rule, RuleSet};

/// Translates the pool plus the change request into the clause set the
/// search runs over. Root and keep assertions are not generated here; the
/// solver asserts roots itself so it can relax them one by one.
pub struct RuleGenerator<'a> {
    pool: &'a Pool,
    env: &'a Environment,
}

impl<'a> RuleGenerator<'a> {
    pub fn new(pool: &'a Pool, env: &'a Environment) -> Self {
        Self { pool, env }
    }

    pub fn generate(&self, request: &ChangeRequest) -> RuleSet {
        let mut rules = RuleSet::new();

        self.add_requirement_rules(&mut rules);
        self.add_singleton_rules(&mut rules);
        self.add_removal_rules(&mut rules, request);

        log::debug!("Generated {} rules", rules.len());
        rules
    }

    /// One clause `(-X | Y1 | ... | Yn)` per non-optional requirement of
    /// every pool variable. An empty disjunction leaves `(-X)`, forcing the
    /// owner false unless it is a hard root (then the root is reported as
    /// conflicting instead).
    fn add_requirement_rules(&self, rules: &mut RuleSet) {
        for var in self.pool.vars() {
            let Some(component) = self.pool.component(var) else {
                continue;
            };
            for requirement in component.required() {
                if requirement.is_optional() {
                    continue;
                }
                let targets = self.pool.candidates_for(requirement, self.env);
                rules.add(Rule::requires(var, targets, requirement.clone()));
            }
        }
    }

    /// Pairwise mutual exclusion among variables sharing an id where either
    /// party is a singleton. Two non-singleton versions may co-exist.
    fn add_singleton_rules(&self, rules: &mut RuleSet) {
        for (_, group) in self.pool.vars_by_id() {
            for (i, &a) in group.iter().enumerate() {
                for &b in &group[i + 1..] {
                    let singleton = self.pool.component(a).is_some_and(|c| c.is_singleton())
                        || self.pool.component(b).is_some_and(|c| c.is_singleton());
                    if singleton {
                        rules.add(Rule::singleton(a, b));
                    }
                }
            }
        }
    }

    /// Force every explicitly removed variable false. A component both
    /// removed and re-added is treated as an addition.
    fn add_removal_rules(&self, rules: &mut RuleSet, request: &ChangeRequest) {
        for component in request.removals() {
            let key = component.key();
            if request.is_addition(&key) {
                continue;
            }
            if let Some(var) = self.pool.var(&key) {
                rules.add(Rule::remove(var));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, MemoryCatalog};
    use crate::metadata::{Component, Requirement};
    use crate::profile::Profile;
    use crate::solver::rule::RuleType;
    use provisor_version::{Version, VersionRange};

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    fn r(text: &str) -> VersionRange {
        VersionRange::parse(text).unwrap()
    }

    #[test]
    fn test_requires_and_singleton_rules() {
        let app = Component::builder("app", v("1.0"))
            .requires(Requirement::on_id("lib", r("*")))
            .build()
            .unwrap();
        let lib1 = Component::builder("lib", v("1.0"))
            .singleton(true)
            .build()
            .unwrap();
        let lib2 = Component::builder("lib", v("2.0"))
            .singleton(true)
            .build()
            .unwrap();
        let catalog = MemoryCatalog::from_components([app, lib1, lib2]);

        let mut request = ChangeRequest::new();
        request.install(catalog.by_identity("app", &r("*"))[0].clone());

        let env = Environment::new();
        let pool = Pool::build(&catalog, &Profile::empty(), &request, &env);
        let rules = RuleGenerator::new(&pool, &env).generate(&request);

        let requires: Vec<&Rule> = rules
            .iter()
            .filter(|rule| rule.rule_type() == RuleType::Requires)
            .collect();
        assert_eq!(requires.len(), 1);
        // -app | lib1 | lib2
        assert_eq!(requires[0].literals().len(), 3);

        let singletons: Vec<&Rule> = rules
            .iter()
            .filter(|rule| rule.rule_type() == RuleType::Singleton)
            .collect();
        assert_eq!(singletons.len(), 1);
    }

    #[test]
    fn test_missing_provider_forces_owner_false() {
        let app = Component::builder("app", v("1.0"))
            .requires(Requirement::on_id("ghost", r("*")))
            .build()
            .unwrap();
        let catalog = MemoryCatalog::from_components([app]);

        let mut request = ChangeRequest::new();
        request.install(catalog.by_identity("app", &r("*"))[0].clone());

        let env = Environment::new();
        let pool = Pool::build(&catalog, &Profile::empty(), &request, &env);
        let rules = RuleGenerator::new(&pool, &env).generate(&request);

        let rule = rules
            .iter()
            .find(|rule| rule.rule_type() == RuleType::Requires)
            .unwrap();
        assert_eq!(rule.literals().len(), 1);
        assert!(rule.literals()[0] < 0);
    }

    #[test]
    fn test_optional_requirements_make_no_rules() {
        let app = Component::builder("app", v("1.0"))
            .requires(Requirement::on_id("ghost", r("*")).optional(true))
            .build()
            .unwrap();
        let catalog = MemoryCatalog::from_components([app]);

        let mut request = ChangeRequest::new();
        request.install(catalog.by_identity("app", &r("*"))[0].clone());

        let env = Environment::new();
        let pool = Pool::build(&catalog, &Profile::empty(), &request, &env);
        let rules = RuleGenerator::new(&pool, &env).generate(&request);

        assert!(rules
            .iter()
            .all(|rule| rule.rule_type() != RuleType::Requires));
    }

    #[test]
    fn test_non_singleton_versions_coexist() {
        let lib1 = Component::builder("lib", v("1.0")).build().unwrap();
        let lib2 = Component::builder("lib", v("2.0")).build().unwrap();
        let catalog = MemoryCatalog::from_components([lib1, lib2]);

        let mut request = ChangeRequest::new();
        for c in catalog.iter() {
            request.install(c.clone());
        }

        let env = Environment::new();
        let pool = Pool::build(&catalog, &Profile::empty(), &request, &env);
        let rules = RuleGenerator::new(&pool, &env).generate(&request);

        assert!(rules
            .iter()
            .all(|rule| rule.rule_type() != RuleType::Singleton));
    }

    #[test]
    fn test_removal_rule() {
        let lib = Component::builder("lib", v("1.0")).build().unwrap();
        let catalog = MemoryCatalog::from_components([lib]);
        let installed = catalog.by_identity("lib", &r("*"))[0].clone();
        let other = std::sync::Arc::new(Component::builder("other", v("1.0")).build().unwrap());
        let profile = Profile::new(
            [installed.clone(), other],
            Vec::<(String, String)>::new(),
        );

        let mut request = ChangeRequest::new();
        request.remove(installed);

        let env = Environment::new();
        let pool = Pool::build(&catalog, &profile, &request, &env);
        let rules = RuleGenerator::new(&pool, &env).generate(&request);

        // "other" stays in the pool, "lib" is reachable only if something
        // requires it; the removal rule only appears when the variable exists
        let removes: Vec<&Rule> = rules
            .iter()
            .filter(|rule| rule.rule_type() == RuleType::Remove)
            .collect();
        assert!(removes.len() <= 1);
    }
}
