//! The sort registry.
//!
//! A registry owns every sort of one context: the arena, the name map, the
//! time-ordered chronicle, the attribute intern table and the match memo. It
//! also carries the per-session state the parser needs: the hook stack of
//! names whose definitions are in progress and the *newbies* list of sorts
//! created since the session began, which `undo_new_sorts` rolls back.
//!
//! # Invariants
//! - Every sort in the arena carries this registry's id.
//! - A name maps to at most one sort; re-registration is an error.
//! - Creation timestamps are strictly increasing.
//! - An unnamed attribute sort is reachable from the intern table under its
//!   canonical string.

use crate::arena::{Arena, RegistryId, SortId};
use crate::category::{CategorySource, Form};
use crate::config::RegistryConfig;
use crate::error::{Diagnostic, SortError};
use crate::fingerprint::{pair_key, HashValue};
use crate::matching::{self, Match, MatchId, MatchReport, MatchTable};
use crate::parser;
use crate::sort::{RecursiveSort, Sort, SortKind, SortStats};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// A name whose definition is being parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Hook {
    pub(crate) name: String,
    /// Recursive placeholder, created on the first self-reference.
    pub(crate) placeholder: Option<SortId>,
}

pub struct Registry {
    id: RegistryId,
    config: RegistryConfig,
    categories: Box<dyn CategorySource>,
    sorts: Arena<Sort>,
    names: BTreeMap<String, SortId>,
    chronicle: Vec<SortId>,
    clock: u64,
    hooks: Vec<Hook>,
    newbies: Vec<SortId>,
    interned: HashMap<String, SortId>,
    matches: MatchTable,
}

impl Registry {
    /// Creates an empty registry over the given categories.
    pub fn new(categories: impl CategorySource + 'static) -> Self {
        Self::with_config(categories, RegistryConfig::default())
    }

    pub fn with_config(categories: impl CategorySource + 'static, config: RegistryConfig) -> Self {
        Self {
            id: RegistryId::fresh(),
            config,
            categories: Box::new(categories),
            sorts: Arena::new(),
            names: BTreeMap::new(),
            chronicle: Vec::new(),
            clock: 0,
            hooks: Vec::new(),
            newbies: Vec::new(),
            interned: HashMap::new(),
            matches: MatchTable::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> RegistryId {
        self.id
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn categories(&self) -> &dyn CategorySource {
        self.categories.as_ref()
    }

    /// Number of live sorts.
    pub fn len(&self) -> usize {
        self.sorts.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a live sort of this registry.
    pub fn get(&self, id: SortId) -> Result<&Sort, SortError> {
        if id.registry() != self.id {
            return Err(SortError::IllegalArgument(format!(
                "{} belongs to another registry",
                id
            )));
        }
        self.sorts
            .get(id.slot(), id.generation())
            .ok_or_else(|| SortError::UnknownSort(id.to_string()))
    }

    pub(crate) fn get_mut(&mut self, id: SortId) -> Result<&mut Sort, SortError> {
        if id.registry() != self.id {
            return Err(SortError::IllegalArgument(format!(
                "{} belongs to another registry",
                id
            )));
        }
        self.sorts
            .get_mut(id.slot(), id.generation())
            .ok_or_else(|| SortError::UnknownSort(id.to_string()))
    }

    pub fn sort(&self, id: SortId) -> Option<&Sort> {
        self.get(id).ok()
    }

    pub fn display(&self, id: SortId) -> Result<&str, SortError> {
        Ok(self.get(id)?.display())
    }

    /// The sort registered under `name`.
    pub fn sort_of(&self, name: &str) -> Option<SortId> {
        self.names.get(name).copied()
    }

    /// Registered names in lexical order.
    pub fn names(&self) -> impl Iterator<Item = (&str, SortId)> {
        self.names.iter().map(|(name, &id)| (name.as_str(), id))
    }

    /// Live sorts in creation order.
    pub fn sorts(&self) -> impl Iterator<Item = &Sort> {
        self.chronicle.iter().filter_map(|&id| self.sorts.get(id.slot(), id.generation()))
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Compiles `text` and returns the last sort it defines.
    ///
    /// On failure every sort created by this call is rolled back.
    pub fn define(&mut self, text: &str) -> Result<SortId, Diagnostic> {
        parser::define(self, text)
    }

    /// Compiles `text` and returns every top-level sort it defines.
    pub fn define_all(&mut self, text: &str) -> Result<Vec<SortId>, Diagnostic> {
        parser::define_all(self, text)
    }

    pub(crate) fn begin_session(&mut self) {
        self.newbies.clear();
        self.hooks.clear();
        debug!(registry = %self.config.label, "session started");
    }

    /// Removes every sort created since the session began.
    ///
    /// Returns the number of sorts removed.
    pub fn undo_new_sorts(&mut self) -> usize {
        let newbies = std::mem::take(&mut self.newbies);
        let removed: HashSet<SortId> = newbies.iter().copied().collect();
        for &id in newbies.iter().rev() {
            let Some(sort) = self.sorts.deallocate(id.slot(), id.generation()) else {
                continue;
            };
            if let Some(name) = &sort.name {
                if self.names.get(name) == Some(&id) {
                    self.names.remove(name);
                }
            }
            if self.interned.get(&sort.canonical) == Some(&id) {
                self.interned.remove(&sort.canonical);
            }
        }
        self.chronicle.retain(|id| !removed.contains(id));
        self.hooks.clear();
        let purged = self.matches.purge(&removed);
        if purged > 0 {
            warn!(registry = %self.config.label, purged, "rollback purged memoized matches");
        }
        debug!(registry = %self.config.label, removed = removed.len(), "session rolled back");
        removed.len()
    }

    /// Clears all registry state.
    pub fn cleanup(&mut self) {
        self.sorts.clear();
        self.names.clear();
        self.chronicle.clear();
        self.hooks.clear();
        self.newbies.clear();
        self.interned.clear();
        self.matches.clear();
        debug!(registry = %self.config.label, "registry cleared");
    }

    // ------------------------------------------------------------------
    // Creation and naming
    // ------------------------------------------------------------------

    /// Stores a new sort, stamping it with the next timestamp.
    pub(crate) fn allocate(
        &mut self,
        name: Option<String>,
        canonical: String,
        stats: SortStats,
        kind: SortKind,
    ) -> SortId {
        let created = self.clock;
        self.clock += 1;
        let (slot, generation) = self.sorts.next_slot();
        let id = SortId::new(self.id, slot, generation);
        let stored = self.sorts.allocate(Sort {
            id,
            name,
            canonical,
            created,
            stats,
            kind,
        });
        debug_assert_eq!(stored, (slot, generation));
        self.chronicle.push(id);
        self.newbies.push(id);
        id
    }

    /// Makes a named sort reachable through `sort_of`.
    pub fn register(&mut self, id: SortId) -> Result<(), SortError> {
        let sort = self.get(id)?;
        let Some(name) = sort.name().map(str::to_string) else {
            return Err(SortError::IllegalArgument(format!(
                "cannot register unnamed sort `{}`",
                sort.display()
            )));
        };
        match self.names.get(&name) {
            Some(&existing) if existing == id => Ok(()),
            Some(_) => Err(SortError::IllegalOverwrite(format!(
                "`{}` is already defined",
                name
            ))),
            None => {
                debug!(registry = %self.config.label, name = %name, "registered sort");
                self.names.insert(name, id);
                Ok(())
            }
        }
    }

    pub(crate) fn interned(&self, canonical: &str) -> Option<SortId> {
        self.interned.get(canonical).copied()
    }

    pub(crate) fn intern(&mut self, canonical: String, id: SortId) {
        self.interned.insert(canonical, id);
    }

    /// Number of interned composite sorts.
    pub fn interned_count(&self) -> usize {
        self.interned.len()
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Announces that the definition of `name` begins.
    pub(crate) fn push_hook(&mut self, name: &str) -> Result<(), SortError> {
        if self.hooks.iter().any(|hook| hook.name == name) {
            return Err(SortError::IllegalOverwrite(format!(
                "`{}` is already being defined",
                name
            )));
        }
        if self.names.contains_key(name) {
            return Err(SortError::IllegalOverwrite(format!(
                "`{}` is already defined",
                name
            )));
        }
        self.hooks.push(Hook {
            name: name.to_string(),
            placeholder: None,
        });
        Ok(())
    }

    /// Resolves a reference to an in-progress name, creating its recursive
    /// placeholder on first use. `None` if `name` is not in progress.
    pub(crate) fn hook_reference(&mut self, name: &str) -> Option<SortId> {
        let index = self.hooks.iter().rposition(|hook| hook.name == name)?;
        if let Some(placeholder) = self.hooks[index].placeholder {
            return Some(placeholder);
        }
        let placeholder = self.allocate(
            Some(name.to_string()),
            name.to_string(),
            SortStats::PLACEHOLDER,
            SortKind::Recursive(RecursiveSort::default()),
        );
        debug!(registry = %self.config.label, name, "recursive placeholder created");
        self.hooks[index].placeholder = Some(placeholder);
        Some(placeholder)
    }

    pub(crate) fn pop_hook(&mut self) -> Option<Hook> {
        self.hooks.pop()
    }

    /// Names currently in progress, innermost last.
    pub fn pending_hooks(&self) -> impl Iterator<Item = &str> {
        self.hooks.iter().map(|hook| hook.name.as_str())
    }

    /// Binds a recursive sort to its instance. A second bind is an error.
    pub fn bind(&mut self, recursive: SortId, instance: SortId) -> Result<(), SortError> {
        if recursive == instance {
            return Err(SortError::IllegalArgument(format!(
                "{} cannot be its own instance",
                recursive
            )));
        }
        let target = self.get(instance)?;
        if target.as_aspects().is_some() {
            return Err(SortError::IllegalArgument(
                "an aspects sort cannot be the instance of a recursive sort".to_string(),
            ));
        }
        let (canonical, stats) = (target.canonical.clone(), target.stats);
        let sort = self.get_mut(recursive)?;
        let name = sort.display().to_string();
        match &mut sort.kind {
            SortKind::Recursive(r) if r.instance.is_some() => Err(SortError::IllegalOverwrite(
                format!("recursive sort `{}` is already bound", name),
            )),
            SortKind::Recursive(r) => {
                r.instance = Some(instance);
                sort.canonical = canonical;
                sort.stats = stats;
                debug!(registry = %self.config.label, name = %name, "recursive sort bound");
                Ok(())
            }
            _ => Err(SortError::IllegalArgument(format!(
                "`{}` is not a recursive sort",
                name
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Delegating queries
    // ------------------------------------------------------------------

    /// Follows recursive sorts to the sort they stand for.
    pub fn resolve(&self, id: SortId) -> Result<SortId, SortError> {
        let mut cursor = id;
        for _ in 0..=self.len() {
            match self.get(cursor)?.as_recursive() {
                Some(r) => match r.instance {
                    Some(instance) => cursor = instance,
                    None => {
                        return Err(SortError::IllegalArgument(format!(
                            "recursive sort `{}` is not bound",
                            self.display(cursor)?
                        )))
                    }
                },
                None => return Ok(cursor),
            }
        }
        Err(SortError::IllegalArgument(format!(
            "recursive sort `{}` does not resolve",
            self.display(id)?
        )))
    }

    pub fn is_simple(&self, id: SortId) -> Result<bool, SortError> {
        Ok(self.get(self.resolve(id)?)?.is_simple())
    }

    /// Characteristic category of a primitive, aspects or aspect sort.
    pub fn category_of(&self, id: SortId) -> Result<Option<&str>, SortError> {
        let sort = self.get(self.resolve(id)?)?;
        Ok(match &sort.kind {
            SortKind::Primitive(p) => Some(p.category()),
            SortKind::Aspects(a) => Some(a.category()),
            SortKind::Aspect(a) => self.get(a.owner)?.as_aspects().map(|o| o.category()),
            _ => None,
        })
    }

    /// The argument sort an aspect reaches.
    pub fn argument(&self, aspect: SortId) -> Result<SortId, SortError> {
        let sort = self.get(aspect)?;
        let Some(view) = sort.as_aspect() else {
            return Err(SortError::IllegalArgument(format!(
                "`{}` is not an aspect",
                sort.display()
            )));
        };
        let owner = self.get(view.owner)?;
        owner
            .as_aspects()
            .and_then(|o| o.arguments().get(view.position).copied())
            .ok_or_else(|| SortError::UnknownSort(format!("argument of `{}`", sort.display())))
    }

    /// Asks the category owner for a container of `id`.
    pub fn new_form(&self, id: SortId) -> Result<Option<Form>, SortError> {
        let tag = self.category_of(id)?;
        Ok(self.categories.new_form(tag, id))
    }

    // ------------------------------------------------------------------
    // Matching
    // ------------------------------------------------------------------

    /// Computes (or fetches) the match of `lhs` against `rhs`.
    ///
    /// Recursion depth follows the nesting of both sorts; see
    /// [`matching::engine`] for the stack this needs on long chains.
    pub fn match_sorts(&mut self, lhs: SortId, rhs: SortId) -> Result<MatchId, SortError> {
        matching::relate(self, lhs, rhs)
    }

    pub fn get_match(&self, id: MatchId) -> Option<&Match> {
        self.matches.get(id)
    }

    pub fn matches(&self) -> &MatchTable {
        &self.matches
    }

    pub(crate) fn matches_mut(&mut self) -> &mut MatchTable {
        &mut self.matches
    }

    pub(crate) fn approve_match(&mut self, key: HashValue, id: MatchId) -> MatchId {
        self.matches.approve(key, id, &self.config)
    }

    /// Chains `alternative` behind `head` when alternatives are kept.
    pub(crate) fn chain_alternative(&mut self, head: MatchId, alternative: MatchId) -> bool {
        if !self.config.keep_alternatives {
            return false;
        }
        self.matches
            .append_alternative(head, alternative, self.config.max_alternatives)
    }

    /// Memo key of the ordered pair `(lhs, rhs)`.
    pub(crate) fn pair_key(&self, lhs: SortId, rhs: SortId) -> Result<HashValue, SortError> {
        Ok(pair_key(
            &self.config.label,
            self.id,
            self.display(lhs)?,
            self.display(rhs)?,
        ))
    }

    /// Structured report of a match for external rendering.
    pub fn report(&self, id: MatchId) -> Option<MatchReport> {
        MatchReport::build(self, id)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("id", &self.id)
            .field("label", &self.config.label)
            .field("sorts", &self.len())
            .field("names", &self.names)
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{CategoryTable, ParamShape};
    use crate::operations::{duplicate, primitive};

    fn registry() -> Registry {
        Registry::new(CategoryTable::new().with_category("Label", ParamShape::Identifier))
    }

    #[test]
    fn timestamps_increase() {
        let mut reg = registry();
        let a = primitive(&mut reg, "Label", None).unwrap();
        let b = primitive(&mut reg, "Label", None).unwrap();
        assert!(reg.get(a).unwrap().created() < reg.get(b).unwrap().created());
        let order: Vec<_> = reg.sorts().map(Sort::id).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn register_rejects_collisions() {
        let mut reg = registry();
        let p = primitive(&mut reg, "Label", None).unwrap();
        let a = duplicate(&mut reg, p, "a").unwrap();
        reg.register(a).unwrap();
        reg.register(a).unwrap();
        let other = duplicate(&mut reg, p, "a").unwrap();
        assert!(matches!(reg.register(other), Err(SortError::IllegalOverwrite(_))));
        assert!(matches!(reg.register(p), Err(SortError::IllegalArgument(_))));
    }

    #[test]
    fn foreign_ids_are_rejected() {
        let mut one = registry();
        let two = registry();
        let p = primitive(&mut one, "Label", None).unwrap();
        assert!(matches!(two.get(p), Err(SortError::IllegalArgument(_))));
    }

    #[test]
    fn bind_once() {
        let mut reg = registry();
        reg.push_hook("r").unwrap();
        let r = reg.hook_reference("r").unwrap();
        assert_eq!(reg.hook_reference("r"), Some(r));
        let p = primitive(&mut reg, "Label", None).unwrap();
        reg.bind(r, p).unwrap();
        assert!(matches!(reg.bind(r, p), Err(SortError::IllegalOverwrite(_))));
        assert_eq!(reg.resolve(r).unwrap(), p);
        assert!(reg.is_simple(r).unwrap());
        assert_eq!(reg.category_of(r).unwrap(), Some("Label"));
    }

    #[test]
    fn hooks_reject_nested_redefinition() {
        let mut reg = registry();
        reg.push_hook("x").unwrap();
        assert!(matches!(reg.push_hook("x"), Err(SortError::IllegalOverwrite(_))));
        assert_eq!(reg.pending_hooks().collect::<Vec<_>>(), vec!["x"]);
        assert!(reg.hook_reference("y").is_none());
    }

    #[test]
    fn undo_frees_names_and_slots() {
        let mut reg = registry();
        reg.begin_session();
        let p = primitive(&mut reg, "Label", None).unwrap();
        let a = duplicate(&mut reg, p, "a").unwrap();
        reg.register(a).unwrap();
        assert_eq!(reg.undo_new_sorts(), 2);
        assert!(reg.sort_of("a").is_none());
        assert!(reg.get(a).is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn names_and_interned_chains_are_listed() {
        let mut reg = registry();
        let b = reg.define("b: [Label] b").unwrap();
        let a = reg.define("a: [Label] a").unwrap();
        let ab = reg.define("a ^ b").unwrap();
        assert_eq!(reg.define("a ^ b").unwrap(), ab);
        assert_eq!(reg.interned_count(), 1);
        assert_eq!(reg.names().collect::<Vec<_>>(), vec![("a", a), ("b", b)]);
        assert_eq!(reg.get(a).unwrap().definition(), "a: [Label] a");
        assert_eq!(reg.get(ab).unwrap().definition(), "a^b");
    }

    #[test]
    fn new_form_forwards_identity() {
        let table = CategoryTable::new()
            .with_category("Label", ParamShape::Identifier)
            .with_factory("Label", |sort| Box::new(sort) as Form);
        let mut reg = Registry::new(table);
        let p = primitive(&mut reg, "Label", None).unwrap();
        let form = reg.new_form(p).unwrap().unwrap();
        assert_eq!(form.downcast_ref::<SortId>(), Some(&p));
    }
}
