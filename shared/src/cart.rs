//! Cart Model
//!
//! In-memory selection state before checkout. Entries are keyed by
//! `(menu item id, sorted add-on set)`; quantities are always positive.
//!
//! The string form of a key is `<id>|dress:<A+B>` (bare `<id>` without
//! add-ons). `|dress:` is reserved and never appears in a catalog id, so a
//! key can always be split back into its base id.

use crate::models::{AddOn, CreateOrderRequest, Menu, MenuItem, OrderItem};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Reserved separator between item id and add-ons in a key string
pub const KEY_DELIMITER: &str = "|dress:";

/// Composite cart key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CartKey {
    item_id: String,
    add_ons: BTreeSet<AddOn>,
}

impl CartKey {
    pub fn new(item_id: impl Into<String>, add_ons: impl IntoIterator<Item = AddOn>) -> Self {
        Self {
            item_id: item_id.into(),
            add_ons: add_ons.into_iter().collect(),
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn add_ons(&self) -> impl Iterator<Item = AddOn> + '_ {
        self.add_ons.iter().copied()
    }

    /// Parse a key string; unknown add-on names make the key invalid
    pub fn parse(key: &str) -> Option<Self> {
        match key.split_once(KEY_DELIMITER) {
            None => (!key.is_empty()).then(|| Self::new(key, [])),
            Some((id, add_ons)) if !id.is_empty() => {
                let add_ons = add_ons
                    .split('+')
                    .filter(|s| !s.is_empty())
                    .map(AddOn::parse)
                    .collect::<Option<BTreeSet<_>>>()?;
                Some(Self {
                    item_id: id.to_string(),
                    add_ons,
                })
            }
            Some(_) => None,
        }
    }

    fn label(&self) -> String {
        let mut names: Vec<&str> = self.add_ons.iter().map(AddOn::as_str).collect();
        names.sort_unstable();
        names.join("+")
    }
}

impl fmt::Display for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.add_ons.is_empty() {
            f.write_str(&self.item_id)
        } else {
            write!(f, "{}{}{}", self.item_id, KEY_DELIMITER, self.label())
        }
    }
}

/// Selection state for one checkout
#[derive(Debug, Clone)]
pub struct Cart<'m> {
    menu: &'m Menu,
    entries: BTreeMap<CartKey, u32>,
    out_of_stock: HashSet<String>,
    is_employee_order: bool,
}

impl<'m> Cart<'m> {
    pub fn new(menu: &'m Menu) -> Self {
        Self {
            menu,
            entries: BTreeMap::new(),
            out_of_stock: HashSet::new(),
            is_employee_order: false,
        }
    }

    /// Key for an item; add-ons are dropped for items that do not allow them
    fn key_for(&self, item: &MenuItem, add_ons: &[AddOn]) -> CartKey {
        if item.allows_add_ons {
            CartKey::new(item.id, add_ons.iter().copied())
        } else {
            CartKey::new(item.id, [])
        }
    }

    /// +1 on the entry; no-op (returns false) for unknown or out-of-stock items
    pub fn increment(&mut self, item_id: &str, add_ons: &[AddOn]) -> bool {
        let Some(item) = self.menu.find(item_id) else {
            return false;
        };
        if self.out_of_stock.contains(item_id) {
            return false;
        }
        let key = self.key_for(item, add_ons);
        *self.entries.entry(key).or_insert(0) += 1;
        true
    }

    /// -1 on the entry, removing it at zero
    pub fn decrement(&mut self, item_id: &str, add_ons: &[AddOn]) -> bool {
        let Some(item) = self.menu.find(item_id) else {
            return false;
        };
        let key = self.key_for(item, add_ons);
        match self.entries.get_mut(&key) {
            Some(qty) if *qty > 1 => {
                *qty -= 1;
                true
            }
            Some(_) => {
                self.entries.remove(&key);
                true
            }
            None => false,
        }
    }

    pub fn quantity_of(&self, item_id: &str, add_ons: &[AddOn]) -> u32 {
        self.menu
            .find(item_id)
            .map(|item| self.key_for(item, add_ons))
            .and_then(|key| self.entries.get(&key).copied())
            .unwrap_or(0)
    }

    /// Empty the cart and reset the employee flag
    pub fn clear(&mut self) {
        self.entries.clear();
        self.is_employee_order = false;
    }

    /// Mark an item (un)available. Marking out of stock purges every variant
    /// of that item; matching is on the base id, not a string prefix.
    pub fn set_out_of_stock(&mut self, item_id: &str, flag: bool) {
        if flag {
            self.out_of_stock.insert(item_id.to_string());
            self.entries.retain(|key, _| key.item_id != item_id);
        } else {
            self.out_of_stock.remove(item_id);
        }
    }

    pub fn is_out_of_stock(&self, item_id: &str) -> bool {
        self.out_of_stock.contains(item_id)
    }

    pub fn set_employee_order(&mut self, flag: bool) {
        self.is_employee_order = flag;
    }

    pub fn is_employee_order(&self) -> bool {
        self.is_employee_order
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&CartKey, u32)> {
        self.entries.iter().map(|(k, q)| (k, *q))
    }

    /// Total units in the cart
    pub fn item_count(&self) -> u32 {
        self.entries.values().sum()
    }

    /// base price + add-on deltas
    fn unit_price(&self, item: &MenuItem, key: &CartKey) -> i64 {
        item.base_price
            + key
                .add_ons
                .iter()
                .map(|a| self.menu.add_on_price(*a))
                .sum::<i64>()
    }

    /// Σ (basePrice + Σ addOnPrice) × qty
    pub fn total(&self) -> i64 {
        self.entries
            .iter()
            .filter_map(|(key, qty)| {
                self.menu
                    .find(&key.item_id)
                    .map(|item| self.unit_price(item, key) * i64::from(*qty))
            })
            .sum()
    }

    /// Snapshot lines for checkout
    pub fn to_order_items(&self) -> Vec<OrderItem> {
        self.entries
            .iter()
            .filter_map(|(key, qty)| {
                let item = self.menu.find(&key.item_id)?;
                Some(OrderItem {
                    name: item.name.to_string(),
                    category: item.category.as_str().to_string(),
                    qty: i64::from(*qty),
                    unit_price: self.unit_price(item, key) as f64,
                    add_ons: key.add_ons.iter().map(|a| a.as_str().to_string()).collect(),
                })
            })
            .collect()
    }

    /// Distinct categories touched by the cart, in first-seen order
    pub fn categories(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for key in self.entries.keys() {
            if let Some(item) = self.menu.find(&key.item_id) {
                let name = item.category.as_str();
                if !out.iter().any(|c| c == name) {
                    out.push(name.to_string());
                }
            }
        }
        out
    }

    /// Checkout payload for `POST /api/orders`
    pub fn checkout_request(&self) -> CreateOrderRequest {
        CreateOrderRequest {
            categories: Some(self.categories()),
            items: self.to_order_items(),
            total_amount: Some(self.total() as f64),
            is_employee_order: self.is_employee_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddOnPrice, Category, MENU};

    static PRICED_ITEMS: [MenuItem; 3] = [
        MenuItem {
            id: "salad-x",
            name: "Salad X",
            category: Category::SaladBowls,
            base_price: 100,
            allows_add_ons: true,
        },
        MenuItem {
            id: "hot-tea",
            name: "Tea",
            category: Category::HotBeverages,
            base_price: 30,
            allows_add_ons: false,
        },
        MenuItem {
            id: "hot-tea-lemon",
            name: "Lemon Tea",
            category: Category::HotBeverages,
            base_price: 40,
            allows_add_ons: false,
        },
    ];
    static PRICED_ADD_ONS: [AddOnPrice; 2] = [
        AddOnPrice {
            add_on: AddOn::Mint,
            price: 10,
        },
        AddOnPrice {
            add_on: AddOn::Yogurt,
            price: 15,
        },
    ];
    static PRICED: Menu = Menu {
        items: &PRICED_ITEMS,
        add_ons: &PRICED_ADD_ONS,
    };

    #[test]
    fn add_on_order_does_not_change_entry() {
        let mut cart = Cart::new(&PRICED);
        cart.increment("salad-x", &[AddOn::Mint, AddOn::Yogurt]);
        cart.increment("salad-x", &[AddOn::Yogurt, AddOn::Mint]);

        assert_eq!(cart.entries().count(), 1);
        assert_eq!(cart.quantity_of("salad-x", &[AddOn::Mint, AddOn::Yogurt]), 2);
        let (key, _) = cart.entries().next().unwrap();
        assert_eq!(key.to_string(), "salad-x|dress:Mint+Yogurt");
    }

    #[test]
    fn total_includes_add_on_prices() {
        let mut cart = Cart::new(&PRICED);
        cart.increment("salad-x", &[AddOn::Mint, AddOn::Yogurt]);
        cart.increment("salad-x", &[]);
        cart.increment("hot-tea", &[]);
        cart.increment("hot-tea", &[]);
        // (100 + 10 + 15) + 100 + 2 × 30
        assert_eq!(cart.total(), 285);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn add_ons_ignored_for_items_without_them() {
        let mut cart = Cart::new(&PRICED);
        cart.increment("hot-tea", &[AddOn::Mint]);
        cart.increment("hot-tea", &[]);
        assert_eq!(cart.entries().count(), 1);
        assert_eq!(cart.total(), 60);
    }

    #[test]
    fn decrement_removes_entry_at_zero() {
        let mut cart = Cart::new(&PRICED);
        cart.increment("hot-tea", &[]);
        assert!(cart.decrement("hot-tea", &[]));
        assert!(cart.is_empty());
        assert!(!cart.decrement("hot-tea", &[]));
    }

    #[test]
    fn out_of_stock_blocks_increment_and_purges_variants() {
        let mut cart = Cart::new(&PRICED);
        cart.increment("salad-x", &[AddOn::Mint]);
        cart.increment("salad-x", &[]);
        cart.set_out_of_stock("salad-x", true);

        assert!(cart.is_empty());
        assert!(!cart.increment("salad-x", &[]));

        cart.set_out_of_stock("salad-x", false);
        assert!(cart.increment("salad-x", &[]));
    }

    #[test]
    fn purge_does_not_touch_ids_sharing_a_prefix() {
        let mut cart = Cart::new(&PRICED);
        cart.increment("hot-tea", &[]);
        cart.increment("hot-tea-lemon", &[]);
        cart.set_out_of_stock("hot-tea", true);

        assert_eq!(cart.quantity_of("hot-tea", &[]), 0);
        assert_eq!(cart.quantity_of("hot-tea-lemon", &[]), 1);
    }

    #[test]
    fn clear_resets_employee_flag() {
        let mut cart = Cart::new(&PRICED);
        cart.set_employee_order(true);
        cart.increment("hot-tea", &[]);
        cart.clear();
        assert!(cart.is_empty());
        assert!(!cart.is_employee_order());
    }

    #[test]
    fn unknown_item_is_ignored() {
        let mut cart = Cart::new(&MENU);
        assert!(!cart.increment("pizza", &[]));
        assert!(cart.is_empty());
    }

    #[test]
    fn checkout_request_snapshots_lines() {
        let mut cart = Cart::new(&PRICED);
        cart.increment("salad-x", &[AddOn::Yogurt]);
        cart.increment("hot-tea", &[]);
        let req = cart.checkout_request();

        assert_eq!(req.total_amount, Some(145.0));
        assert_eq!(
            req.categories,
            Some(vec!["Hot Beverages".to_string(), "Salad Bowls".to_string()])
        );
        let salad = req.items.iter().find(|i| i.name == "Salad X").unwrap();
        assert_eq!(salad.unit_price, 115.0);
        assert_eq!(salad.add_ons, vec!["Yogurt"]);
    }

    #[test]
    fn key_parse_splits_on_reserved_delimiter() {
        let key = CartKey::parse("salad-x|dress:Yogurt+Mint").unwrap();
        assert_eq!(key.item_id(), "salad-x");
        assert_eq!(key.add_ons().collect::<Vec<_>>(), vec![AddOn::Yogurt, AddOn::Mint]);
        assert_eq!(key, CartKey::new("salad-x", [AddOn::Mint, AddOn::Yogurt]));

        assert_eq!(CartKey::parse("hot-tea").unwrap().item_id(), "hot-tea");
        assert!(CartKey::parse("salad-x|dress:Ketchup").is_none());
        assert!(CartKey::parse("|dress:Mint").is_none());
    }
}
