use approx::assert_relative_eq;

use super::network::Ledger;


/// Checks that two ledgers cover the same links with the same ridership.
pub fn compare_ledgers(query_ledger: &Ledger, true_ledger: &Ledger) {
    assert_eq!(query_ledger.len(), true_ledger.len());

    for (link_id, true_riders) in true_ledger {
        match query_ledger.get(link_id) {
            Some(riders) => assert_relative_eq!(*riders, *true_riders, epsilon = 1e-9),
            None => assert!(false, "Link {} missing!", link_id),
        }
    }
}
