use diesel::prelude::*;
use diesel::SqliteConnection;
use shared::{CreatePart, Session};

use super::{non_negative, now_stamp, require_admin, required, Store};
use crate::db::schema::inventory;
use crate::error::{conflict_on_unique, GarageError, GarageResult};
use crate::models::{NewPart, Part};

pub const DEFAULT_RESTOCK_THRESHOLD: i32 = 10;
pub const DEFAULT_RESTOCK_AMOUNT: i32 = 20;

const DUPLICATE_PART: &str = "Part already exists";

/// Parts a fresh garage starts with. Price and supplier are filled in later.
const STARTER_PARTS: &[(&str, i32)] = &[
    ("Spark Plugs", 15),
    ("Brake Pads", 10),
    ("Oil Filter", 20),
    ("Timing Belt", 8),
];

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: Vec<String>,
}

fn validated_part(req: &CreatePart) -> GarageResult<NewPart> {
    let part_name = required(&req.part_name, "Part name")?;
    let supplier = required(&req.supplier, "Supplier")?;
    if req.quantity < 0 {
        return Err(GarageError::validation("Quantity cannot be negative"));
    }
    let price = non_negative(req.price, "Price")?;
    Ok(NewPart {
        part_name,
        quantity: req.quantity,
        price,
        supplier: Some(supplier),
        last_ordered: None,
    })
}

fn part_exists(conn: &mut SqliteConnection, name: &str) -> QueryResult<bool> {
    let count: i64 = inventory::table
        .filter(inventory::part_name.eq(name))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

fn positive_quantity(qty: i32) -> GarageResult<i32> {
    if qty <= 0 {
        return Err(GarageError::validation("Quantity must be greater than zero"));
    }
    Ok(qty)
}

fn increased_quantity(part: &Part, qty: i32) -> GarageResult<i32> {
    part.quantity.checked_add(qty).ok_or_else(|| {
        GarageError::validation(format!(
            "Quantity of '{}' would exceed {}",
            part.part_name,
            i32::MAX
        ))
    })
}

impl Store {
    pub fn list_parts(&mut self) -> GarageResult<Vec<shared::InventoryPart>> {
        let rows = inventory::table
            .order(inventory::part_name.asc())
            .select(Part::as_select())
            .load(&mut self.conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn find_part(&mut self, name: &str) -> GarageResult<Part> {
        let name = name.trim();
        inventory::table
            .filter(inventory::part_name.eq(name))
            .select(Part::as_select())
            .first(&mut self.conn)
            .optional()?
            .ok_or_else(|| GarageError::not_found(format!("Part '{name}' not found")))
    }

    pub fn add_part(
        &mut self,
        actor: &Session,
        req: &CreatePart,
    ) -> GarageResult<shared::InventoryPart> {
        require_admin(actor, "add parts")?;
        let new_part = validated_part(req)?;
        if part_exists(&mut self.conn, &new_part.part_name)? {
            return Err(GarageError::Conflict(DUPLICATE_PART.to_string()));
        }
        let part = diesel::insert_into(inventory::table)
            .values(&new_part)
            .returning(Part::as_returning())
            .get_result(&mut self.conn)
            .map_err(conflict_on_unique(DUPLICATE_PART))?;
        tracing::info!(part = %part.part_name, quantity = part.quantity, "added part");
        Ok(part.into())
    }

    /// Receive stock from the supplier.
    pub fn order_part(
        &mut self,
        actor: &Session,
        part_name: &str,
        qty: i32,
    ) -> GarageResult<shared::InventoryPart> {
        let qty = positive_quantity(qty)?;
        let part = self.find_part(part_name)?;
        let quantity = increased_quantity(&part, qty)?;
        let updated = diesel::update(inventory::table.find(part.id))
            .set((
                inventory::quantity.eq(quantity),
                inventory::last_ordered.eq(Some(now_stamp())),
            ))
            .returning(Part::as_returning())
            .get_result(&mut self.conn)?;
        tracing::info!(part = %updated.part_name, qty, by = %actor.username, "ordered part");
        Ok(updated.into())
    }

    /// Take stock out of inventory. Fails without change when there is not
    /// enough on hand.
    pub fn ship_part(
        &mut self,
        actor: &Session,
        part_name: &str,
        qty: i32,
    ) -> GarageResult<shared::InventoryPart> {
        let qty = positive_quantity(qty)?;
        let part = self.find_part(part_name)?;
        if qty > part.quantity {
            return Err(GarageError::validation(format!(
                "Only {} of '{}' in stock",
                part.quantity, part.part_name
            )));
        }
        let updated = diesel::update(inventory::table.find(part.id))
            .set(inventory::quantity.eq(inventory::quantity - qty))
            .returning(Part::as_returning())
            .get_result(&mut self.conn)?;
        tracing::info!(part = %updated.part_name, qty, by = %actor.username, "shipped part");
        Ok(updated.into())
    }

    /// Top up every part below `threshold` by `amount`. Returns the names
    /// that were restocked.
    pub fn restock_low(
        &mut self,
        actor: &Session,
        threshold: i32,
        amount: i32,
    ) -> GarageResult<Vec<String>> {
        require_admin(actor, "restock inventory")?;
        let amount = positive_quantity(amount)?;
        let now = now_stamp();

        let restocked = self.conn.transaction::<_, GarageError, _>(|conn| {
            let low: Vec<Part> = inventory::table
                .filter(inventory::quantity.lt(threshold))
                .order(inventory::part_name.asc())
                .select(Part::as_select())
                .load(conn)?;
            for part in &low {
                let quantity = increased_quantity(part, amount)?;
                diesel::update(inventory::table.find(part.id))
                    .set((
                        inventory::quantity.eq(quantity),
                        inventory::last_ordered.eq(Some(now.clone())),
                    ))
                    .execute(conn)?;
            }
            Ok(low.into_iter().map(|p| p.part_name).collect::<Vec<_>>())
        })?;

        tracing::info!(count = restocked.len(), threshold, amount, "restocked low parts");
        Ok(restocked)
    }

    /// Insert the starter parts when the inventory is empty. Returns how many
    /// rows were added.
    pub fn seed_inventory(&mut self) -> GarageResult<usize> {
        let existing: i64 = inventory::table.count().get_result(&mut self.conn)?;
        if existing > 0 {
            return Ok(0);
        }
        let rows: Vec<NewPart> = STARTER_PARTS
            .iter()
            .map(|(name, quantity)| NewPart {
                part_name: name.to_string(),
                quantity: *quantity,
                price: 0.0,
                supplier: None,
                last_ordered: None,
            })
            .collect();
        let inserted = diesel::insert_into(inventory::table)
            .values(&rows)
            .execute(&mut self.conn)?;
        tracing::info!(inserted, "seeded starter inventory");
        Ok(inserted)
    }

    /// Bulk insert parts in one transaction. Parts that already exist are
    /// skipped; any invalid row aborts the whole batch.
    pub fn import_parts(
        &mut self,
        actor: &Session,
        parts: &[CreatePart],
    ) -> GarageResult<ImportSummary> {
        require_admin(actor, "import parts")?;
        let validated = parts
            .iter()
            .map(validated_part)
            .collect::<GarageResult<Vec<_>>>()?;

        self.conn.transaction::<_, GarageError, _>(|conn| {
            let mut summary = ImportSummary::default();
            for part in &validated {
                if part_exists(conn, &part.part_name)? {
                    summary.skipped.push(part.part_name.clone());
                    continue;
                }
                diesel::insert_into(inventory::table)
                    .values(part)
                    .execute(conn)
                    .map_err(conflict_on_unique(DUPLICATE_PART))?;
                summary.imported += 1;
            }
            Ok(summary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use super::*;

    fn part(name: &str, quantity: i32) -> CreatePart {
        CreatePart {
            part_name: name.to_string(),
            quantity,
            price: 9.5,
            supplier: "NAPA".to_string(),
        }
    }

    fn quantity_of(store: &mut Store, name: &str) -> i32 {
        store
            .list_parts()
            .unwrap()
            .into_iter()
            .find(|p| p.part_name == name)
            .unwrap()
            .quantity
    }

    #[test]
    fn add_part_validates_and_rejects_duplicates() {
        let mut store = testing::store();
        let admin = testing::admin(&mut store);
        assert!(matches!(
            store.add_part(&admin, &part("Gasket", -1)),
            Err(GarageError::Validation(_))
        ));
        let mut no_supplier = part("Gasket", 1);
        no_supplier.supplier = " ".to_string();
        assert!(matches!(
            store.add_part(&admin, &no_supplier),
            Err(GarageError::Validation(_))
        ));

        store.add_part(&admin, &part("Gasket", 4)).unwrap();
        let err = store.add_part(&admin, &part("Gasket", 4)).unwrap_err();
        assert!(matches!(err, GarageError::Conflict(ref m) if m == DUPLICATE_PART));
    }

    #[test]
    fn mechanics_cannot_add_parts() {
        let mut store = testing::store();
        let sam = testing::mechanic(&mut store, "sam", "Sam Spanner");
        assert!(matches!(
            store.add_part(&sam, &part("Gasket", 1)),
            Err(GarageError::Forbidden(_))
        ));
    }

    #[test]
    fn order_adds_stock_and_stamps_date() {
        let mut store = testing::store();
        let admin = testing::admin(&mut store);
        store.add_part(&admin, &part("Gasket", 4)).unwrap();
        let updated = store.order_part(&admin, "Gasket", 6).unwrap();
        assert_eq!(updated.quantity, 10);
        assert!(updated.last_ordered.is_some());

        assert!(matches!(
            store.order_part(&admin, "Gasket", 0),
            Err(GarageError::Validation(_))
        ));
        assert!(matches!(
            store.order_part(&admin, "Widget", 1),
            Err(GarageError::NotFound(_))
        ));
    }

    #[test]
    fn oversized_order_is_rejected_without_change() {
        let mut store = testing::store();
        let admin = testing::admin(&mut store);
        store.seed_inventory().unwrap();

        let err = store.order_part(&admin, "Spark Plugs", i32::MAX).unwrap_err();
        assert!(matches!(err, GarageError::Validation(_)));
        assert_eq!(quantity_of(&mut store, "Spark Plugs"), 15);

        store.ship_part(&admin, "Spark Plugs", 1).unwrap();
        assert_eq!(quantity_of(&mut store, "Spark Plugs"), 14);
    }

    #[test]
    fn oversized_restock_rolls_back_every_part() {
        let mut store = testing::store();
        let admin = testing::admin(&mut store);
        store.seed_inventory().unwrap();

        let err = store.restock_low(&admin, 16, i32::MAX - 10).unwrap_err();
        assert!(matches!(err, GarageError::Validation(_)));
        assert_eq!(quantity_of(&mut store, "Timing Belt"), 8);
        assert_eq!(quantity_of(&mut store, "Brake Pads"), 10);
        assert_eq!(quantity_of(&mut store, "Spark Plugs"), 15);
    }

    #[test]
    fn shipping_more_than_stock_fails_without_change() {
        let mut store = testing::store();
        let admin = testing::admin(&mut store);
        store.add_part(&admin, &part("Gasket", 4)).unwrap();

        assert!(matches!(
            store.ship_part(&admin, "Gasket", 5),
            Err(GarageError::Validation(_))
        ));
        assert_eq!(quantity_of(&mut store, "Gasket"), 4);

        store.ship_part(&admin, "Gasket", 4).unwrap();
        assert_eq!(quantity_of(&mut store, "Gasket"), 0);
    }

    #[test]
    fn restock_only_touches_low_parts() {
        let mut store = testing::store();
        let admin = testing::admin(&mut store);
        assert_eq!(store.seed_inventory().unwrap(), 4);
        assert_eq!(store.seed_inventory().unwrap(), 0);

        let restocked = store
            .restock_low(&admin, DEFAULT_RESTOCK_THRESHOLD, DEFAULT_RESTOCK_AMOUNT)
            .unwrap();
        assert_eq!(restocked, vec!["Timing Belt"]);
        assert_eq!(quantity_of(&mut store, "Timing Belt"), 28);
        assert_eq!(quantity_of(&mut store, "Brake Pads"), 10);
    }

    #[test]
    fn parts_are_listed_by_name() {
        let mut store = testing::store();
        store.seed_inventory().unwrap();
        let names: Vec<_> = store
            .list_parts()
            .unwrap()
            .into_iter()
            .map(|p| p.part_name)
            .collect();
        assert_eq!(
            names,
            vec!["Brake Pads", "Oil Filter", "Spark Plugs", "Timing Belt"]
        );
    }

    #[test]
    fn import_skips_existing_and_rejects_bad_batches() {
        let mut store = testing::store();
        let admin = testing::admin(&mut store);
        store.add_part(&admin, &part("Gasket", 4)).unwrap();

        let summary = store
            .import_parts(&admin, &[part("Gasket", 1), part("Hose", 2)])
            .unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, vec!["Gasket"]);

        let err = store
            .import_parts(&admin, &[part("Clamp", 1), part("Fuse", -3)])
            .unwrap_err();
        assert!(matches!(err, GarageError::Validation(_)));
        assert_eq!(store.list_parts().unwrap().len(), 2);
    }
}
