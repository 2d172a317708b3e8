//! Price quote gathering
//!
//! Fans out independent quote lookups per (instance, topology, purchase
//! option) combination, joins them into one immutable [`QuoteSet`], and
//! falls back to a broader reservation-offering source when the primary
//! source has no reserved price. A read-through cache short-circuits
//! repeat lookups and is never invalidated mid-run.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::models::{InstanceSpec, MigrationStrategy, PriceQuote, PurchaseOption, Topology};

/// Primary pricing source for one (instance, purchase option) lookup.
///
/// `Ok(None)` means the source has no price for the combination; errors
/// are treated the same way by the gatherer, after a warning.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self, spec: &InstanceSpec, option: PurchaseOption)
        -> Result<Option<PriceQuote>>;
}

/// Secondary source of reservation offerings, consulted when the primary
/// source has no reserved price.
#[async_trait]
pub trait ReservationSource: Send + Sync {
    async fn fetch_offering(
        &self,
        spec: &InstanceSpec,
        option: PurchaseOption,
    ) -> Result<Option<ReservedOffering>>;
}

/// One reservation offering: a one-time fixed price plus an effective
/// hourly rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReservedOffering {
    pub fixed_price: f64,
    pub effective_hourly: f64,
}

/// Lookup key within a joined quote set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteKey {
    pub instance_type: String,
    pub strategy: MigrationStrategy,
    pub topology: Topology,
    pub option: PurchaseOption,
}

impl QuoteKey {
    fn of(spec: &InstanceSpec, option: PurchaseOption) -> Self {
        Self {
            instance_type: spec.instance_type.clone(),
            strategy: spec.strategy,
            topology: spec.topology,
            option,
        }
    }
}

/// Immutable snapshot of every gathered quote.
#[derive(Debug, Clone, Default)]
pub struct QuoteSet {
    quotes: HashMap<QuoteKey, PriceQuote>,
}

impl QuoteSet {
    pub fn insert(&mut self, spec: &InstanceSpec, option: PurchaseOption, quote: PriceQuote) {
        self.quotes.insert(QuoteKey::of(spec, option), quote);
    }

    pub fn get(
        &self,
        instance_type: &str,
        strategy: MigrationStrategy,
        topology: Topology,
        option: PurchaseOption,
    ) -> Option<&PriceQuote> {
        self.quotes.get(&QuoteKey {
            instance_type: instance_type.to_string(),
            strategy,
            topology,
            option,
        })
    }

    /// Monthly cost for a combination, `None` when absent or unavailable.
    pub fn monthly_cost(
        &self,
        instance_type: &str,
        strategy: MigrationStrategy,
        topology: Topology,
        option: PurchaseOption,
    ) -> Option<f64> {
        self.get(instance_type, strategy, topology, option)
            .filter(|quote| quote.available)
            .and_then(|quote| quote.monthly_cost)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Cache key spanning every dimension a quote depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    instance_type: String,
    region: String,
    engine: String,
    topology: Topology,
    option: PurchaseOption,
}

impl CacheKey {
    fn of(spec: &InstanceSpec, option: PurchaseOption) -> Self {
        Self {
            instance_type: spec.instance_type.clone(),
            region: spec.region.clone(),
            engine: spec.engine.clone(),
            topology: spec.topology,
            option,
        }
    }
}

/// Concurrent quote gatherer over a primary and an optional fallback
/// source.
pub struct QuoteGatherer {
    source: Arc<dyn QuoteSource>,
    reservations: Option<Arc<dyn ReservationSource>>,
    cache: Arc<DashMap<CacheKey, PriceQuote>>,
}

impl QuoteGatherer {
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self {
            source,
            reservations: None,
            cache: Arc::new(DashMap::new()),
        }
    }

    pub fn with_reservation_fallback(mut self, reservations: Arc<dyn ReservationSource>) -> Self {
        self.reservations = Some(reservations);
        self
    }

    /// Gather quotes for every (spec, purchase option) combination.
    ///
    /// One failed lookup becomes an unavailable quote; it never aborts
    /// sibling lookups.
    pub async fn gather(&self, specs: &[InstanceSpec]) -> QuoteSet {
        let mut tasks: JoinSet<(InstanceSpec, PurchaseOption, PriceQuote)> = JoinSet::new();

        for spec in specs {
            for option in PurchaseOption::ALL {
                let key = CacheKey::of(spec, option);
                if let Some(hit) = self.cache.get(&key) {
                    debug!(instance = %spec.instance_type, option = option.key_suffix(), "quote cache hit");
                    tasks.spawn(ready_quote(spec.clone(), option, hit.clone()));
                    continue;
                }

                let source = Arc::clone(&self.source);
                let reservations = self.reservations.clone();
                let cache = Arc::clone(&self.cache);
                let spec = spec.clone();
                tasks.spawn(async move {
                    let quote = lookup(source, reservations, &spec, option).await;
                    cache.insert(CacheKey::of(&spec, option), quote.clone());
                    (spec, option, quote)
                });
            }
        }

        let mut set = QuoteSet::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((spec, option, quote)) => set.insert(&spec, option, quote),
                Err(e) => warn!(error = %e, "quote lookup task failed to join"),
            }
        }
        set
    }
}

async fn ready_quote(
    spec: InstanceSpec,
    option: PurchaseOption,
    quote: PriceQuote,
) -> (InstanceSpec, PurchaseOption, PriceQuote) {
    (spec, option, quote)
}

/// One lookup: primary source, then the reservation-offering fallback for
/// reserved options, then an explicit unavailable quote.
async fn lookup(
    source: Arc<dyn QuoteSource>,
    reservations: Option<Arc<dyn ReservationSource>>,
    spec: &InstanceSpec,
    option: PurchaseOption,
) -> PriceQuote {
    match source.fetch(spec, option).await {
        Ok(Some(quote)) => return quote,
        Ok(None) => {}
        Err(e) => {
            warn!(
                instance = %spec.instance_type,
                option = option.key_suffix(),
                error = %e,
                "primary quote lookup failed"
            );
        }
    }

    if option.term_months().is_some() {
        if let Some(reservations) = reservations {
            match reservations.fetch_offering(spec, option).await {
                Ok(Some(offering)) => {
                    debug!(
                        instance = %spec.instance_type,
                        option = option.key_suffix(),
                        "reserved price recovered from offering fallback"
                    );
                    return PriceQuote::from_offering(
                        spec.clone(),
                        option,
                        offering.fixed_price,
                        offering.effective_hourly,
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        instance = %spec.instance_type,
                        option = option.key_suffix(),
                        error = %e,
                        "reservation offering lookup failed"
                    );
                }
            }
        }
    }

    PriceQuote::unavailable(spec.clone(), option)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn spec(instance: &str, topology: Topology) -> InstanceSpec {
        InstanceSpec {
            instance_type: instance.to_string(),
            region: "ap-northeast-2".to_string(),
            engine: "oracle-ee".to_string(),
            strategy: MigrationStrategy::Replatform,
            topology,
        }
    }

    /// On-demand prices only; counts lookups to observe the cache.
    struct OnDemandOnly {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteSource for OnDemandOnly {
        async fn fetch(
            &self,
            spec: &InstanceSpec,
            option: PurchaseOption,
        ) -> Result<Option<PriceQuote>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match option {
                PurchaseOption::OnDemand => Some(PriceQuote::on_demand(spec.clone(), 1.0)),
                _ => None,
            })
        }
    }

    struct FixedOffering;

    #[async_trait]
    impl ReservationSource for FixedOffering {
        async fn fetch_offering(
            &self,
            _spec: &InstanceSpec,
            option: PurchaseOption,
        ) -> Result<Option<ReservedOffering>> {
            Ok(match option {
                PurchaseOption::Ri3yrAllUpfront => Some(ReservedOffering {
                    fixed_price: 3600.0,
                    effective_hourly: 0.0,
                }),
                _ => None,
            })
        }
    }

    #[tokio::test]
    async fn test_missing_quotes_become_unavailable() {
        let gatherer = QuoteGatherer::new(Arc::new(OnDemandOnly {
            calls: AtomicUsize::new(0),
        }));
        let specs = vec![spec("db.r6i.xlarge", Topology::SingleZone)];
        let set = gatherer.gather(&specs).await;

        assert_eq!(set.len(), PurchaseOption::ALL.len());
        assert!(set
            .monthly_cost(
                "db.r6i.xlarge",
                MigrationStrategy::Replatform,
                Topology::SingleZone,
                PurchaseOption::OnDemand
            )
            .is_some());
        let reserved = set
            .get(
                "db.r6i.xlarge",
                MigrationStrategy::Replatform,
                Topology::SingleZone,
                PurchaseOption::Ri1yrNoUpfront,
            )
            .unwrap();
        assert!(!reserved.available);
        assert_eq!(reserved.monthly_cost, None);
    }

    #[tokio::test]
    async fn test_offering_fallback_fills_reserved_gap() {
        let gatherer = QuoteGatherer::new(Arc::new(OnDemandOnly {
            calls: AtomicUsize::new(0),
        }))
        .with_reservation_fallback(Arc::new(FixedOffering));

        let specs = vec![spec("db.r6i.xlarge", Topology::SingleZone)];
        let set = gatherer.gather(&specs).await;

        let quote = set
            .get(
                "db.r6i.xlarge",
                MigrationStrategy::Replatform,
                Topology::SingleZone,
                PurchaseOption::Ri3yrAllUpfront,
            )
            .unwrap();
        assert!(quote.available);
        // 3600 amortized over 36 months
        assert_eq!(quote.monthly_cost, Some(100.0));
    }

    #[tokio::test]
    async fn test_cache_short_circuits_repeat_lookups() {
        let source = Arc::new(OnDemandOnly {
            calls: AtomicUsize::new(0),
        });
        let gatherer = QuoteGatherer::new(source.clone());

        let specs = vec![spec("db.r6i.xlarge", Topology::SingleZone)];
        gatherer.gather(&specs).await;
        let first_pass = source.calls.load(Ordering::SeqCst);

        gatherer.gather(&specs).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), first_pass);
    }
}
