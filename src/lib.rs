//! Thin facade wiring the SQLite-backed stores in `calendar-data` to the
//! `calendar-core` rule engine. Carries no HTTP/CLI surface of its own;
//! embedding an engine instance in a server is the embedder's concern.

use std::path::Path;
use std::sync::Arc;

pub use calendar_core::{cancel::CancellationToken, day::DayFactory, error::Error, types::Day};

/// Opens the SQLite-backed stores at `path` and returns a [`DayFactory`]
/// ready to build `Day`s.
///
/// `use_julian` selects Old Calendar (Julian) civil-date reckoning;
/// `with_bible` controls whether scripture text is resolved or left as
/// bare references (a lighter-weight mode when only readings metadata is
/// needed).
pub fn open(path: impl AsRef<Path>, use_julian: bool, with_bible: bool) -> calendar_core::error::Result<DayFactory> {
    let stores = calendar_data::SqliteStores::open(path)?;
    let calendar_data::SqliteStores {
        commemorations,
        readings,
        bible,
    } = stores;

    let bible: Option<Arc<dyn calendar_core::store::BibleStore>> =
        if with_bible { Some(Arc::new(bible)) } else { None };

    Ok(DayFactory::new(
        Arc::new(commemorations),
        Arc::new(readings),
        bible,
        use_julian,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use calendar_core::cancel::CancellationToken;
    use calendar_core::store::{CommemorationStore, ReadingPredicate, ReadingStore};
    use calendar_core::types::{CommemorationRow, ReadingRow};

    struct FailingCommemorations;
    impl CommemorationStore for FailingCommemorations {
        fn query(
            &self,
            _pdist: i32,
            _float_index: Option<i32>,
            _month: i32,
            _day: i32,
            _cancel: &CancellationToken,
        ) -> calendar_core::error::Result<Vec<CommemorationRow>> {
            Err(Error::StoreUnavailable {
                message: "table locked".into(),
            })
        }
    }

    struct EmptyReadings;
    impl ReadingStore for EmptyReadings {
        fn query(
            &self,
            _predicate: &ReadingPredicate,
            _cancel: &CancellationToken,
        ) -> calendar_core::error::Result<Vec<ReadingRow>> {
            Ok(Vec::new())
        }
    }

    /// A store outage degrades the day's commemorations, logged via
    /// `tracing`, rather than failing `build` outright.
    #[test]
    fn store_outage_is_logged_and_degrades_gracefully() {
        let _subscriber = tracing_subscriber::fmt().with_test_writer().set_default();

        let factory = DayFactory::new(
            Arc::new(FailingCommemorations),
            Arc::new(EmptyReadings),
            None,
            false,
        );
        let token = CancellationToken::new();
        let day = factory.build(2018, 4, 8, &token).unwrap();
        assert!(day.titles.is_empty());
        assert!(day.feasts.is_empty());
    }
}
