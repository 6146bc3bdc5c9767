use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::cache::{CachedLookup, StatusCache, StatusKey};
use super::{AccessorySelection, ReadinessVerdict, TrackedItem};
use crate::catalog::{HomologationLookup, ItemKind};
use crate::config::RulesConfig;
use crate::matching::{are_equivalent_keys, normalize, NormalizedKey};

/// Ticket handed out when a recompute starts. Only the newest ticket of a
/// vehicle may store its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

/// Stored state of one vehicle. `verdict` is `None` while the newest
/// recompute is still in flight.
struct Slot {
    generation: Generation,
    verdict: Option<ReadinessVerdict>,
}

/// Per-session readiness state for the vehicles being scheduled.
///
/// Every `recompute` replaces the stored verdict for its vehicle; nothing is
/// patched incrementally. A recompute that finishes after a newer one for the
/// same vehicle was started is discarded, and a vehicle reads as not ready
/// while its newest recompute is in flight. Lookups go through a
/// [`CachedLookup`] so toggling between selections does not ask the backend
/// again for resolved items.
pub struct ReadinessAggregator {
    lookup: CachedLookup,
    modules: Vec<NormalizedKey>,
    slots: RwLock<HashMap<String, Slot>>,
    next_generation: AtomicU64,
}

impl ReadinessAggregator {
    pub fn new(lookup: Arc<dyn HomologationLookup>) -> Self {
        Self::with_cache(lookup, Arc::new(StatusCache::new()))
    }

    /// Share an existing status cache, e.g. across aggregators of one session
    pub fn with_cache(lookup: Arc<dyn HomologationLookup>, cache: Arc<StatusCache>) -> Self {
        Self {
            lookup: CachedLookup::new(lookup, cache),
            modules: Self::module_keys(&RulesConfig::default().module_names),
            slots: RwLock::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Replace the module denylist
    pub fn with_module_names<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.modules = Self::module_keys(names);
        self
    }

    fn module_keys<S: AsRef<str>>(names: &[S]) -> Vec<NormalizedKey> {
        names
            .iter()
            .map(|n| normalize(n.as_ref()))
            .filter(|k| !k.is_empty())
            .collect()
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        self.lookup.cache()
    }

    /// Containment match against the denylist, so a bare fragment such as
    /// `CAN` or `MODULO` is also treated as a module and skips the gate.
    pub fn is_module(&self, key: &NormalizedKey) -> bool {
        self.modules.iter().any(|module| are_equivalent_keys(key, module))
    }

    /// Customer and vehicle accessories, deduplicated by key, blanks and
    /// modules removed. First spelling wins.
    pub fn tracked_items(&self, selection: &AccessorySelection) -> Vec<TrackedItem> {
        let mut seen = HashSet::new();
        selection
            .customer
            .iter()
            .chain(selection.vehicle.iter())
            .filter_map(|name| {
                let key = normalize(name);
                if key.is_empty() || self.is_module(&key) || !seen.insert(key.clone()) {
                    return None;
                }
                Some(TrackedItem {
                    name: name.clone(),
                    key,
                    kind: ItemKind::Accessory,
                })
            })
            .collect()
    }

    /// Ask for every key concurrently. `None` marks anything without a
    /// definite answer; failures are logged, never returned.
    async fn resolve(&self, keys: Vec<StatusKey>) -> HashMap<StatusKey, Option<bool>> {
        let lookups = keys.iter().map(|(key, kind)| self.lookup.lookup(key, *kind));
        let answers = join_all(lookups).await;

        keys.into_iter()
            .zip(answers)
            .map(|((key, kind), answer)| {
                let status = match answer {
                    Ok(Some(homologated)) => Some(homologated),
                    Ok(None) => {
                        debug!("Homologation still pending for {} ({})", key, kind.as_str());
                        None
                    }
                    Err(e) => {
                        warn!("Homologation lookup failed for {}: {}. Treating as not homologated", key, e);
                        None
                    }
                };
                ((key, kind), status)
            })
            .collect()
    }

    fn build_verdict(
        vehicle_plate: &str,
        items: &[TrackedItem],
        statuses: &HashMap<StatusKey, Option<bool>>,
    ) -> ReadinessVerdict {
        let mut pending = Vec::new();
        let mut blocking = Vec::new();

        for item in items {
            match statuses.get(&(item.key.clone(), item.kind)).copied().flatten() {
                Some(true) => {}
                Some(false) => blocking.push(item.name.clone()),
                None => pending.push(item.name.clone()),
            }
        }

        ReadinessVerdict {
            vehicle_plate: vehicle_plate.to_string(),
            ready: pending.is_empty() && blocking.is_empty(),
            tracked: items.len(),
            pending,
            blocking,
        }
    }

    /// Verdict from the status cache alone, without asking the backend.
    /// Unresolved items count as pending. Nothing is stored.
    pub async fn evaluate_cached(&self, vehicle_plate: &str, selection: &AccessorySelection) -> ReadinessVerdict {
        let items = self.tracked_items(selection);
        let keys: Vec<StatusKey> = items.iter().map(|i| (i.key.clone(), i.kind)).collect();
        let cached = self.cache().get_many(&keys).await;
        let statuses: HashMap<StatusKey, Option<bool>> = keys
            .into_iter()
            .map(|k| {
                let status = cached.get(&k).copied();
                (k, status)
            })
            .collect();
        Self::build_verdict(vehicle_plate, &items, &statuses)
    }

    fn issue(&self) -> Generation {
        Generation(self.next_generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn open_slot(slots: &mut HashMap<String, Slot>, vehicle_plate: &str, generation: Generation) {
        slots.insert(
            vehicle_plate.to_string(),
            Slot {
                generation,
                verdict: None,
            },
        );
    }

    /// Reserve the next generation for a vehicle. Its stored verdict is
    /// cleared until a recompute holding this generation stores a new one.
    pub async fn reserve(&self, vehicle_plate: &str) -> Generation {
        let generation = self.issue();
        Self::open_slot(&mut *self.slots.write().await, vehicle_plate, generation);
        generation
    }

    /// Store `verdict` unless a newer recompute was started meanwhile
    async fn commit(&self, generation: Generation, verdict: &ReadinessVerdict) -> bool {
        let mut slots = self.slots.write().await;
        match slots.get_mut(&verdict.vehicle_plate) {
            Some(slot) if slot.generation == generation => {
                slot.verdict = Some(verdict.clone());
                true
            }
            _ => {
                debug!(
                    "Discarding stale readiness for {} ({:?})",
                    verdict.vehicle_plate, generation
                );
                false
            }
        }
    }

    /// Recompute one vehicle's verdict from scratch and store it
    pub async fn recompute(&self, vehicle_plate: &str, selection: &AccessorySelection) -> ReadinessVerdict {
        let generation = self.reserve(vehicle_plate).await;
        self.recompute_reserved(vehicle_plate, generation, selection).await
    }

    /// Recompute under a generation taken earlier with [`Self::reserve`].
    /// The verdict is returned either way but only stored if `generation` is
    /// still the newest for the vehicle.
    pub async fn recompute_reserved(
        &self,
        vehicle_plate: &str,
        generation: Generation,
        selection: &AccessorySelection,
    ) -> ReadinessVerdict {
        let items = self.tracked_items(selection);
        let keys = items.iter().map(|i| (i.key.clone(), i.kind)).collect();
        let statuses = self.resolve(keys).await;

        let verdict = Self::build_verdict(vehicle_plate, &items, &statuses);
        debug!(
            "Readiness for {}: ready={} tracked={} pending={} blocking={}",
            vehicle_plate,
            verdict.ready,
            verdict.tracked,
            verdict.pending.len(),
            verdict.blocking.len()
        );
        self.commit(generation, &verdict).await;
        verdict
    }

    /// Recompute a whole board with a single fan-out over the distinct items.
    ///
    /// The batch replaces the board: vehicles absent from it are forgotten.
    pub async fn recompute_all(&self, batch: &[(String, AccessorySelection)]) -> Vec<ReadinessVerdict> {
        let generations: Vec<Generation> = {
            let mut slots = self.slots.write().await;
            let plates: HashSet<&str> = batch.iter().map(|(plate, _)| plate.as_str()).collect();
            let before = slots.len();
            slots.retain(|plate, _| plates.contains(plate.as_str()));
            if slots.len() < before {
                info!("Dropped {} vehicles no longer on the board", before - slots.len());
            }
            batch
                .iter()
                .map(|(plate, _)| {
                    let generation = self.issue();
                    Self::open_slot(&mut slots, plate, generation);
                    generation
                })
                .collect()
        };

        let tracked: Vec<(&str, Vec<TrackedItem>)> = batch
            .iter()
            .map(|(plate, selection)| (plate.as_str(), self.tracked_items(selection)))
            .collect();

        let mut distinct = HashSet::new();
        let keys: Vec<StatusKey> = tracked
            .iter()
            .flat_map(|(_, items)| items.iter())
            .map(|i| (i.key.clone(), i.kind))
            .filter(|k| distinct.insert(k.clone()))
            .collect();
        info!("Resolving {} distinct items for {} vehicles", keys.len(), batch.len());

        let statuses = self.resolve(keys).await;

        let verdicts: Vec<ReadinessVerdict> = tracked
            .iter()
            .map(|(plate, items)| Self::build_verdict(plate, items, &statuses))
            .collect();

        for (verdict, generation) in verdicts.iter().zip(generations) {
            self.commit(generation, verdict).await;
        }
        verdicts
    }

    /// Gate value for a vehicle. A vehicle never recomputed, or whose newest
    /// recompute has not finished, is not ready.
    pub async fn is_ready(&self, vehicle_plate: &str) -> bool {
        self.slots
            .read()
            .await
            .get(vehicle_plate)
            .and_then(|slot| slot.verdict.as_ref())
            .map(|v| v.ready)
            .unwrap_or(false)
    }

    pub async fn verdict(&self, vehicle_plate: &str) -> Option<ReadinessVerdict> {
        self.slots
            .read()
            .await
            .get(vehicle_plate)
            .and_then(|slot| slot.verdict.clone())
    }

    /// Drop a vehicle from the session; an in-flight recompute for it is discarded
    pub async fn forget(&self, vehicle_plate: &str) {
        self.slots.write().await.remove(vehicle_plate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryHomologation;
    use crate::error::LookupError;

    async fn backend(homologated: &[&str]) -> Arc<InMemoryHomologation> {
        let backend = Arc::new(InMemoryHomologation::new());
        for name in homologated {
            backend.set(name, ItemKind::Accessory, true).await;
        }
        backend
    }

    #[tokio::test]
    async fn test_all_homologated_is_ready() {
        let aggregator = ReadinessAggregator::new(backend(&["RFID", "Sirene"]).await);
        let selection = AccessorySelection::vehicle_only(["RFID (2x)", "Sirene"]);

        let verdict = aggregator.recompute("ABC1D23", &selection).await;
        assert!(verdict.ready);
        assert_eq!(verdict.tracked, 2);
        assert!(aggregator.is_ready("ABC1D23").await);
    }

    #[tokio::test]
    async fn test_one_missing_blocks() {
        let aggregator = ReadinessAggregator::new(backend(&["RFID"]).await);
        let selection = AccessorySelection::vehicle_only(["RFID (2x)", "Bloqueio"]);

        let verdict = aggregator.recompute("ABC1D23", &selection).await;
        assert!(!verdict.ready);
        assert_eq!(verdict.pending, vec!["Bloqueio".to_string()]);
        assert!(!aggregator.is_ready("ABC1D23").await);
    }

    #[tokio::test]
    async fn test_explicit_rejection_is_blocking() {
        let table = backend(&["RFID"]).await;
        table.set("Sirene", ItemKind::Accessory, false).await;
        let aggregator = ReadinessAggregator::new(table);

        let verdict = aggregator
            .recompute("X", &AccessorySelection::vehicle_only(["RFID", "Sirene"]))
            .await;
        assert!(!verdict.ready);
        assert_eq!(verdict.blocking, vec!["Sirene".to_string()]);
        assert!(verdict.pending.is_empty());
    }

    #[tokio::test]
    async fn test_empty_selection_is_ready() {
        let aggregator = ReadinessAggregator::new(backend(&[]).await);
        let verdict = aggregator.recompute("X", &AccessorySelection::new()).await;
        assert!(verdict.ready);
        assert_eq!(verdict.tracked, 0);
    }

    #[tokio::test]
    async fn test_unknown_vehicle_is_not_ready() {
        let aggregator = ReadinessAggregator::new(backend(&[]).await);
        assert!(!aggregator.is_ready("never-seen").await);
        assert!(aggregator.verdict("never-seen").await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_closed() {
        let table = backend(&["RFID"]).await;
        table
            .set_failing("Sirene", ItemKind::Accessory, LookupError::TimedOut("SIRENE".into()))
            .await;
        let aggregator = ReadinessAggregator::new(table);

        let verdict = aggregator
            .recompute("X", &AccessorySelection::vehicle_only(["RFID", "Sirene"]))
            .await;
        assert!(!verdict.ready);
        assert_eq!(verdict.pending, vec!["Sirene".to_string()]);
    }

    #[tokio::test]
    async fn test_union_dedupes_and_skips_blanks_and_modules() {
        let aggregator = ReadinessAggregator::new(backend(&[]).await);
        let selection = AccessorySelection::new()
            .with_customer(["Sirene", "Módulo CAN"])
            .with_vehicle(["SIRENE (2x)", "  ", "RFID", "Modulo Bluetooth"]);

        let items = aggregator.tracked_items(&selection);
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Sirene", "RFID"]);
    }

    #[tokio::test]
    async fn test_modules_only_selection_is_ready() {
        let aggregator = ReadinessAggregator::new(backend(&[]).await);
        let verdict = aggregator
            .recompute("X", &AccessorySelection::vehicle_only(["Módulo satelital"]))
            .await;
        assert!(verdict.ready);
    }

    #[tokio::test]
    async fn test_custom_module_names() {
        let aggregator = ReadinessAggregator::new(backend(&[]).await).with_module_names(&["Sirene"]);
        let items = aggregator.tracked_items(&AccessorySelection::vehicle_only(["Sirene dupla", "RFID"]));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key.as_str(), "RFID");
    }

    #[tokio::test]
    async fn test_recompute_replaces_previous_verdict() {
        let aggregator = ReadinessAggregator::new(backend(&["RFID"]).await);

        aggregator.recompute("X", &AccessorySelection::vehicle_only(["RFID"])).await;
        assert!(aggregator.is_ready("X").await);

        // adding an accessory must not leave a stale ready state behind
        aggregator
            .recompute("X", &AccessorySelection::vehicle_only(["RFID", "Bloqueio"]))
            .await;
        assert!(!aggregator.is_ready("X").await);

        aggregator.recompute("X", &AccessorySelection::vehicle_only(["RFID"])).await;
        assert!(aggregator.is_ready("X").await);
    }

    #[tokio::test]
    async fn test_toggling_selection_reuses_cache() {
        let table = backend(&["RFID", "Sirene"]).await;
        let aggregator = ReadinessAggregator::new(table.clone());

        aggregator.recompute("X", &AccessorySelection::vehicle_only(["RFID", "Sirene"])).await;
        assert_eq!(table.calls(), 2);

        aggregator.recompute("X", &AccessorySelection::vehicle_only(["RFID"])).await;
        aggregator.recompute("X", &AccessorySelection::vehicle_only(["RFID", "Sirene"])).await;
        assert_eq!(table.calls(), 2);
        assert_eq!(aggregator.cache().len().await, 2);
    }

    #[tokio::test]
    async fn test_pending_items_are_retried() {
        let table = backend(&["RFID"]).await;
        let aggregator = ReadinessAggregator::new(table.clone());
        let selection = AccessorySelection::vehicle_only(["RFID", "Bloqueio"]);

        assert!(!aggregator.recompute("X", &selection).await.ready);

        table.set("Bloqueio", ItemKind::Accessory, true).await;
        assert!(aggregator.recompute("X", &selection).await.ready);
        // RFID once, Bloqueio twice
        assert_eq!(table.calls(), 3);
    }

    #[tokio::test]
    async fn test_evaluate_cached_does_not_call_backend() {
        let table = backend(&["RFID"]).await;
        let aggregator = ReadinessAggregator::new(table.clone());
        let selection = AccessorySelection::vehicle_only(["RFID"]);

        let before = aggregator.evaluate_cached("X", &selection).await;
        assert!(!before.ready);
        assert_eq!(table.calls(), 0);

        aggregator.recompute("X", &selection).await;
        let after = aggregator.evaluate_cached("X", &selection).await;
        assert!(after.ready);
        assert_eq!(table.calls(), 1);
    }

    #[tokio::test]
    async fn test_recompute_all_single_fan_out() {
        let table = backend(&["RFID", "Sirene"]).await;
        let aggregator = ReadinessAggregator::new(table.clone());
        let batch = vec![
            ("AAA0001".to_string(), AccessorySelection::vehicle_only(["RFID", "Sirene"])),
            ("BBB0002".to_string(), AccessorySelection::vehicle_only(["rfid (3x)", "Bloqueio"])),
            ("CCC0003".to_string(), AccessorySelection::new()),
        ];

        let verdicts = aggregator.recompute_all(&batch).await;
        assert_eq!(verdicts.len(), 3);
        assert!(verdicts[0].ready);
        assert!(!verdicts[1].ready);
        assert!(verdicts[2].ready);

        // RFID, SIRENE, BLOQUEIO: one lookup each
        assert_eq!(table.calls(), 3);
        assert!(aggregator.is_ready("AAA0001").await);
        assert!(!aggregator.is_ready("BBB0002").await);
    }

    #[tokio::test]
    async fn test_forget_vehicle() {
        let aggregator = ReadinessAggregator::new(backend(&[]).await);
        aggregator.recompute("X", &AccessorySelection::new()).await;
        assert!(aggregator.is_ready("X").await);

        aggregator.forget("X").await;
        assert!(!aggregator.is_ready("X").await);
    }

    #[tokio::test]
    async fn test_module_fragments_skip_the_gate() {
        let aggregator = ReadinessAggregator::new(backend(&[]).await);
        let items = aggregator.tracked_items(&AccessorySelection::vehicle_only(["CAN", "Modulo", "Satelital", "RFID"]));
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        // substrings of a module name are excluded with it
        assert_eq!(names, vec!["RFID"]);
    }

    #[tokio::test]
    async fn test_in_flight_recompute_is_not_ready() {
        let aggregator = ReadinessAggregator::new(backend(&["RFID"]).await);
        let selection = AccessorySelection::vehicle_only(["RFID"]);
        aggregator.recompute("X", &selection).await;
        assert!(aggregator.is_ready("X").await);

        let generation = aggregator.reserve("X").await;
        assert!(!aggregator.is_ready("X").await);
        assert!(aggregator.verdict("X").await.is_none());

        aggregator.recompute_reserved("X", generation, &selection).await;
        assert!(aggregator.is_ready("X").await);
    }

    #[tokio::test]
    async fn test_older_generation_is_discarded() {
        let table = backend(&["RFID"]).await;
        table.set("Bloqueio", ItemKind::Accessory, false).await;
        let aggregator = ReadinessAggregator::new(table);

        let older = aggregator.reserve("X").await;
        let newer = aggregator.reserve("X").await;
        assert!(older < newer);

        let latest = aggregator
            .recompute_reserved("X", newer, &AccessorySelection::vehicle_only(["RFID", "Bloqueio"]))
            .await;
        assert!(!latest.ready);

        // finishes last but started first
        let stale = aggregator
            .recompute_reserved("X", older, &AccessorySelection::vehicle_only(["RFID"]))
            .await;
        assert!(stale.ready);
        assert!(!aggregator.is_ready("X").await);
        assert_eq!(aggregator.verdict("X").await.unwrap().blocking, vec!["Bloqueio".to_string()]);
    }

    #[tokio::test]
    async fn test_forget_discards_in_flight_result() {
        let aggregator = ReadinessAggregator::new(backend(&[]).await);
        let generation = aggregator.reserve("X").await;
        aggregator.forget("X").await;

        aggregator.recompute_reserved("X", generation, &AccessorySelection::new()).await;
        assert!(aggregator.verdict("X").await.is_none());
    }

    #[tokio::test]
    async fn test_recompute_all_replaces_board() {
        let aggregator = ReadinessAggregator::new(backend(&["RFID"]).await);
        aggregator
            .recompute_all(&[("AAA0001".to_string(), AccessorySelection::vehicle_only(["RFID"]))])
            .await;
        assert!(aggregator.is_ready("AAA0001").await);

        aggregator
            .recompute_all(&[("BBB0002".to_string(), AccessorySelection::new())])
            .await;
        assert!(!aggregator.is_ready("AAA0001").await);
        assert!(aggregator.verdict("AAA0001").await.is_none());
        assert!(aggregator.is_ready("BBB0002").await);
    }
}
