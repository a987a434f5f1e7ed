//! Menu Catalog
//!
//! Static, immutable menu data. Prices are whole currency units; add-on
//! deltas live next to the items so a price change is a data edit only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Menu category (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Bites,
    Sandwiches,
    #[serde(rename = "Salad Bowls")]
    SaladBowls,
    #[serde(rename = "Fruit Bowls")]
    FruitBowls,
    Smoothies,
    Juices,
    #[serde(rename = "Hot Beverages")]
    HotBeverages,
    #[serde(rename = "Cold Beverages")]
    ColdBeverages,
    Miscellaneous,
}

impl Category {
    /// All categories in menu display order
    pub const ALL: [Category; 9] = [
        Category::Bites,
        Category::Sandwiches,
        Category::SaladBowls,
        Category::FruitBowls,
        Category::Smoothies,
        Category::Juices,
        Category::HotBeverages,
        Category::ColdBeverages,
        Category::Miscellaneous,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::Bites => "Bites",
            Category::Sandwiches => "Sandwiches",
            Category::SaladBowls => "Salad Bowls",
            Category::FruitBowls => "Fruit Bowls",
            Category::Smoothies => "Smoothies",
            Category::Juices => "Juices",
            Category::HotBeverages => "Hot Beverages",
            Category::ColdBeverages => "Cold Beverages",
            Category::Miscellaneous => "Miscellaneous",
        }
    }

    /// Parse a display name (exact match after trimming)
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional dressing attachable to items that allow add-ons
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AddOn {
    Yogurt,
    Chipotle,
    Mint,
}

impl AddOn {
    pub const ALL: [AddOn; 3] = [AddOn::Yogurt, AddOn::Chipotle, AddOn::Mint];

    pub const fn as_str(&self) -> &'static str {
        match self {
            AddOn::Yogurt => "Yogurt",
            AddOn::Chipotle => "Chipotle",
            AddOn::Mint => "Mint",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for AddOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Menu item (catalog entry)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub base_price: i64,
    pub allows_add_ons: bool,
}

/// Price delta of one add-on
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOnPrice {
    pub add_on: AddOn,
    pub price: i64,
}

/// The whole catalog
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub items: &'static [MenuItem],
    pub add_ons: &'static [AddOnPrice],
}

impl Menu {
    pub fn find(&self, id: &str) -> Option<&MenuItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Price delta of an add-on (0 when not listed)
    pub fn add_on_price(&self, add_on: AddOn) -> i64 {
        self.add_ons
            .iter()
            .find(|p| p.add_on == add_on)
            .map(|p| p.price)
            .unwrap_or(0)
    }

    /// Static name → category lookup used when a stored line has no category.
    /// First catalog match wins.
    pub fn category_of_name(&self, name: &str) -> Option<Category> {
        self.items
            .iter()
            .find(|i| i.name == name)
            .map(|i| i.category)
    }

    pub fn items_in(&self, category: Category) -> impl Iterator<Item = &MenuItem> {
        self.items.iter().filter(move |i| i.category == category)
    }
}

const fn item(id: &'static str, category: Category, name: &'static str) -> MenuItem {
    MenuItem {
        id,
        name,
        category,
        base_price: 80,
        allows_add_ons: false,
    }
}

const fn salad(id: &'static str, name: &'static str) -> MenuItem {
    MenuItem {
        id,
        name,
        category: Category::SaladBowls,
        base_price: 80,
        allows_add_ons: true,
    }
}

static MENU_ITEMS: [MenuItem; 32] = [
    // Bites
    item("bites-potato-cheese-balls", Category::Bites, "Potato Cheese Balls"),
    item("bites-rice-paper-dahi-chat", Category::Bites, "Rice Paper Dahi Chat"),
    item("bites-cheesy-soya-corn-kabab", Category::Bites, "Cheesy Soya Corn Kabab"),
    item("bites-potato-stir-fry", Category::Bites, "Potato Stir Fry"),
    item("bites-paneer-chickpea-nuggets", Category::Bites, "Paneer Chickpea Nuggets"),
    // Sandwiches
    item("sandwich-classic-veg", Category::Sandwiches, "Classic Veg Grill Sandwich"),
    item(
        "sandwich-caramelized-onion-mushroom",
        Category::Sandwiches,
        "Caramelized Onion & Mushroom Sandwich",
    ),
    item("sandwich-corn", Category::Sandwiches, "Corn Sandwich"),
    item("sandwich-avocado", Category::Sandwiches, "Avocado Sandwich"),
    // Salad Bowls
    salad("salad-roasted-cauliflower-chickpea", "Roasted Cauliflower & Chickpea Salad"),
    salad("salad-roasted-crispy-potato", "Roasted Crispy Potato Salad"),
    salad("salad-classic-sprouts-peanuts", "Classic Sprouts Salad with Peanuts"),
    salad("salad-protein-packed-soya", "Protein-Packed Soya Salad"),
    // Fruit Bowls
    item("fruit-creamy-fruit-salad", Category::FruitBowls, "Creamy Fruit Salad"),
    item("fruit-cut-fruit-salad", Category::FruitBowls, "Cut Fruit Salad"),
    // Smoothies
    item("smoothie-chia-seeds", Category::Smoothies, "Chia Seeds Smoothie"),
    item("smoothie-chocolate", Category::Smoothies, "Chocolate Smoothie"),
    item("smoothie-banoffee", Category::Smoothies, "Banoffee Smoothie"),
    item("smoothie-avocado", Category::Smoothies, "Avocado Smoothie (Seasonal)"),
    // Juices
    item("juice-abc", Category::Juices, "ABC"),
    item(
        "juice-cucumber-spinach-greenapple",
        Category::Juices,
        "Cucumber Spinach Green Apple",
    ),
    item("juice-watermelon-crush", Category::Juices, "Watermelon Crush Juice"),
    item("juice-muskmelon", Category::Juices, "Muskmelon Juice"),
    item("juice-mint-lime-soda", Category::Juices, "Mint & Lime Soda"),
    // Hot Beverages
    item(
        "hot-filter-coffee",
        Category::HotBeverages,
        "Filter Coffee (sugar/jaggery)",
    ),
    item("hot-black-coffee", Category::HotBeverages, "Black Coffee"),
    item("hot-tea", Category::HotBeverages, "Tea"),
    item("hot-lemon-tea", Category::HotBeverages, "Lemon Tea"),
    item("hot-badam-milk", Category::HotBeverages, "Badam Milk"),
    // Cold Beverages
    item("cold-cold-coffee", Category::ColdBeverages, "Cold Coffee"),
    item("cold-iced-tea", Category::ColdBeverages, "Iced Tea"),
    item("cold-badam-milk", Category::ColdBeverages, "Badam Milk"),
];

static ADD_ON_PRICES: [AddOnPrice; 3] = [
    AddOnPrice {
        add_on: AddOn::Yogurt,
        price: 0,
    },
    AddOnPrice {
        add_on: AddOn::Chipotle,
        price: 0,
    },
    AddOnPrice {
        add_on: AddOn::Mint,
        price: 0,
    },
];

/// The shipped catalog
pub static MENU: Menu = Menu {
    items: &MENU_ITEMS,
    add_ons: &ADD_ON_PRICES,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::KEY_DELIMITER;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_free_of_key_delimiter() {
        let mut seen = HashSet::new();
        for item in MENU.items {
            assert!(seen.insert(item.id), "duplicate id {}", item.id);
            assert!(!item.id.contains(KEY_DELIMITER), "reserved delimiter in {}", item.id);
        }
    }

    #[test]
    fn only_salad_bowls_allow_add_ons() {
        for item in MENU.items {
            assert_eq!(item.allows_add_ons, item.category == Category::SaladBowls);
        }
    }

    #[test]
    fn category_round_trips_display_name() {
        for c in Category::ALL {
            assert_eq!(Category::parse(c.as_str()), Some(c));
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(json, format!("\"{}\"", c.as_str()));
        }
        assert_eq!(Category::parse("Desserts"), None);
    }

    #[test]
    fn name_lookup_prefers_first_match() {
        assert_eq!(MENU.category_of_name("Tea"), Some(Category::HotBeverages));
        assert_eq!(MENU.category_of_name("Badam Milk"), Some(Category::HotBeverages));
        assert_eq!(MENU.category_of_name("Pizza"), None);
    }

    #[test]
    fn add_on_parse_is_case_insensitive() {
        assert_eq!(AddOn::parse("mint"), Some(AddOn::Mint));
        assert_eq!(AddOn::parse(" Yogurt "), Some(AddOn::Yogurt));
        assert_eq!(AddOn::parse("Ketchup"), None);
    }
}
