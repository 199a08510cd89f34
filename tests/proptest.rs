// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Property-based tests for records, rent objects and their projection.
//!
//! These tests verify invariants that should hold for any ledger, whatever
//! order records are added, updated or removed in.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use proptest::sample::Index;
use proptest::test_runner::TestCaseError;
use rent_ledger::{
    DocumentRepository, JsonCollection, MemoryRepository, Record, RecordUpdate, RentObject,
    RentObjectInfo, RentObjectRepository, RentObjectUpdate, UserId,
};
use rust_decimal::Decimal;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Generate an amount between -10000 and 10000 with 2 decimal places.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..=1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Generate a timestamp within a few decades, with frequent collisions.
fn arb_date() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..2_000).prop_map(|days| {
        Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(days * 7)
    })
}

prop_compose! {
    fn arb_record()(
        date in arb_date(),
        rent in arb_amount(),
        heat in arb_amount(),
        exploitation in arb_amount(),
        mop in arb_amount(),
        renovation in arb_amount(),
        tbo in arb_amount(),
        electricity in arb_amount(),
        earth_rent in arb_amount(),
        other in arb_amount(),
        security in arb_amount(),
    ) -> Record {
        Record { date, rent, heat, exploitation, mop, renovation, tbo, electricity, earth_rent, other, security }
    }
}

prop_compose! {
    fn arb_patch()(
        date in proptest::option::of(arb_date()),
        rent in proptest::option::of(arb_amount()),
        heat in proptest::option::of(arb_amount()),
        earth_rent in proptest::option::of(arb_amount()),
        security in proptest::option::of(arb_amount()),
    ) -> RecordUpdate {
        RecordUpdate { date, rent, heat, earth_rent, security, ..RecordUpdate::default() }
    }
}

/// One positional write: re-date and mark the record at `index`, or delete it.
type Step = (Index, bool, DateTime<Utc>);

fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec((any::<Index>(), any::<bool>(), arb_date()), 1..12)
}

fn object_with(records: &[Record], area: Decimal) -> RentObject {
    let mut object = RentObject::new("object", "", area);
    for record in records {
        object.add_record(*record);
    }
    object
}

// =============================================================================
// Record Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Profit is always income minus expenses.
    #[test]
    fn record_profit_identity(record in arb_record()) {
        prop_assert_eq!(record.profit(), record.income() - record.expenses());
        prop_assert_eq!(record.income(), record.rent);
    }

    /// An empty patch changes nothing.
    #[test]
    fn empty_record_patch_is_identity(record in arb_record()) {
        prop_assert_eq!(record.update(&RecordUpdate::default()), record);
    }

    /// Present fields are taken from the patch, absent ones kept.
    #[test]
    fn record_patch_overrides_present_fields(record in arb_record(), patch in arb_patch()) {
        let updated = record.update(&patch);
        prop_assert_eq!(updated.date, patch.date.unwrap_or(record.date));
        prop_assert_eq!(updated.rent, patch.rent.unwrap_or(record.rent));
        prop_assert_eq!(updated.heat, patch.heat.unwrap_or(record.heat));
        prop_assert_eq!(updated.mop, record.mop);
        prop_assert_eq!(updated.other, record.other);
    }
}

// =============================================================================
// Rent Object Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// A full read is always sorted by date, even after swap-removals.
    #[test]
    fn full_read_is_date_sorted(
        records in prop::collection::vec(arb_record(), 1..40),
        deletions in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
    ) {
        let mut object = object_with(&records, Decimal::ONE);
        for index in deletions {
            if object.is_empty() {
                break;
            }
            object.delete_record(index.index(object.len())).unwrap();
        }

        let sorted = object.get_all_records();
        prop_assert!(sorted.windows(2).all(|w| w[0].date <= w[1].date));
    }

    /// The index returned by add_record points at the added record.
    #[test]
    fn add_then_get_by_index(
        existing in prop::collection::vec(arb_record(), 0..20),
        record in arb_record(),
    ) {
        let mut object = object_with(&existing, Decimal::ONE);
        let index = object.add_record(record);
        prop_assert_eq!(object.get_record_by_index(index).unwrap(), record);
    }

    /// Deleting shrinks the ledger by one and removes that record.
    #[test]
    fn delete_shrinks_by_one(
        records in prop::collection::vec(arb_record(), 1..30),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut object = object_with(&records, Decimal::ONE);
        let index = pick.index(object.len());
        let deleted = object.get_record_by_index(index).unwrap();
        let copies_before = object.get_all_records().iter().filter(|r| **r == deleted).count();
        // The read above may have reordered; look the record up again.
        let index = object
            .get_all_records()
            .iter()
            .position(|r| *r == deleted)
            .unwrap();

        object.delete_record(index).unwrap();

        let after = object.get_all_records();
        prop_assert_eq!(after.len(), records.len() - 1);
        prop_assert_eq!(after.iter().filter(|r| **r == deleted).count(), copies_before - 1);
    }

    /// Aggregates equal the sums over all records, including the empty ledger.
    #[test]
    fn aggregates_are_sums(records in prop::collection::vec(arb_record(), 0..30)) {
        let object = object_with(&records, Decimal::ONE);

        let income: Decimal = records.iter().map(|r| r.rent).sum();
        let expenses: Decimal = records.iter().map(Record::expenses).sum();

        prop_assert_eq!(object.income(), income);
        prop_assert_eq!(object.expenses(), expenses);
        prop_assert_eq!(object.profit(), income - expenses);
    }

    /// An empty object patch changes nothing.
    #[test]
    fn empty_object_patch_is_identity(records in prop::collection::vec(arb_record(), 0..10)) {
        let object = object_with(&records, Decimal::TEN);
        prop_assert_eq!(object.update(&RentObjectUpdate::default()), object);
    }

    /// Ratios are the raw figures over the area, or zero for a zero area.
    #[test]
    fn ratios_follow_area(
        records in prop::collection::vec(arb_record(), 1..10),
        area in prop_oneof![Just(Decimal::ZERO), (1i64..100_000).prop_map(|a| Decimal::new(a, 1))],
    ) {
        let info = RentObjectInfo::from(object_with(&records, area));

        prop_assert_eq!(info.records_info.len(), records.len());
        for record_info in &info.records_info {
            if area.is_zero() {
                prop_assert!(record_info.income_by_area.is_zero());
                prop_assert!(record_info.expenses_by_area.is_zero());
                prop_assert!(record_info.profit_by_area.is_zero());
            } else {
                prop_assert_eq!(record_info.income_by_area, record_info.income / area);
                prop_assert_eq!(record_info.expenses_by_area, record_info.expenses / area);
                prop_assert_eq!(record_info.profit_by_area, record_info.profit / area);
            }
        }
    }
}

// =============================================================================
// Repository Properties
// =============================================================================

/// Every positional write addresses the list returned by the last full read.
fn positions_follow_full_reads<R: RentObjectRepository>(
    repository: R,
    records: &[Record],
    steps: &[Step],
) -> Result<(), TestCaseError> {
    let user = UserId(1);
    repository
        .add(user, RentObject::new("object", "", Decimal::ONE))
        .unwrap();
    for record in records {
        repository.add_record(user, "object", *record).unwrap();
    }

    for (step, (pick, redate, date)) in steps.iter().enumerate() {
        let observed = repository.get_all_records(user, "object").unwrap();
        if observed.is_empty() {
            break;
        }
        for (index, seen) in observed.iter().enumerate() {
            prop_assert_eq!(
                repository.get_record_by_index(user, "object", index).unwrap(),
                *seen
            );
        }

        let index = pick.index(observed.len());
        let target = observed[index];
        // Outside the generated amount range, so it tags exactly one record.
        let marker = Decimal::new(-1_000_000_000 - step as i64, 2);
        if *redate {
            let patch = RecordUpdate {
                date: Some(*date),
                rent: Some(marker),
                ..RecordUpdate::default()
            };
            repository.update_record(user, "object", index, &patch).unwrap();
        } else {
            repository.delete_record(user, "object", index).unwrap();
        }

        let after = repository.get_all_records(user, "object").unwrap();
        let count = |list: &[Record], record: &Record| {
            list.iter().filter(|r| *r == record).count()
        };
        prop_assert!(after.windows(2).all(|w| w[0].date <= w[1].date));
        prop_assert_eq!(count(&after, &target), count(&observed, &target) - 1);
        if *redate {
            prop_assert_eq!(after.len(), observed.len());
            let marked: Vec<_> = after.iter().filter(|r| r.rent == marker).collect();
            prop_assert_eq!(marked.len(), 1);
            prop_assert_eq!(marked[0].date, *date);
        } else {
            prop_assert_eq!(after.len(), observed.len() - 1);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Repository record operations agree with the same operations on a local object.
    #[test]
    fn repository_matches_local_object(records in prop::collection::vec(arb_record(), 1..20)) {
        let repository = MemoryRepository::new();
        let user = UserId(1);
        repository.add(user, RentObject::new("object", "", Decimal::ONE)).unwrap();
        let mut local = RentObject::new("object", "", Decimal::ONE);

        for record in &records {
            let stored = repository.add_record(user, "object", *record).unwrap();
            prop_assert_eq!(stored, local.add_record(*record));
        }

        prop_assert_eq!(
            repository.get_all_records(user, "object").unwrap(),
            local.get_all_records()
        );
    }

    /// Deletes and re-dating updates hit the record seen at that position (memory).
    #[test]
    fn memory_positions_follow_full_reads(
        records in prop::collection::vec(arb_record(), 1..15),
        steps in arb_steps(),
    ) {
        positions_follow_full_reads(MemoryRepository::new(), &records, &steps)?;
    }

    /// Deletes and re-dating updates hit the record seen at that position (document).
    #[test]
    fn document_positions_follow_full_reads(
        records in prop::collection::vec(arb_record(), 1..15),
        steps in arb_steps(),
    ) {
        positions_follow_full_reads(
            DocumentRepository::new(JsonCollection::in_memory()),
            &records,
            &steps,
        )?;
    }
}
