use chrono::NaiveDate;
use serde::Serialize;

/// Ordered days of one feed; may contain the same date twice when the
/// requested week windows overlap.
#[derive(Debug, Default, Serialize, Clone, PartialEq)]
pub struct Canteen {
    pub days: Vec<Day>,
}

impl Canteen {
    pub fn new(days: Vec<Day>) -> Self {
        Self { days }
    }

    pub fn days(&self) -> std::slice::Iter<'_, Day> {
        self.days.iter()
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Day {
    pub date: NaiveDate,
    pub categories: Vec<Category>,
}

impl Day {
    pub fn new(date: NaiveDate, categories: Vec<Category>) -> Self {
        Self { date, categories }
    }

    pub fn is_empty(&self) -> bool { self.categories.is_empty() }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub meals: Vec<Meal>,
}

impl Category {
    pub fn new(kind: CategoryKind, meals: Vec<Meal>) -> Self {
        Self { name: kind.name().to_string(), meals }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CategoryKind {
    MainCourses,
    SideDishes,
    Desserts,
    SnacksSalads,
    EveningMenu,
}

impl CategoryKind {
    /// Maps the operator's block class to a category, `None` for
    /// blocks we do not publish.
    pub fn from_class(class: &str) -> Option<Self> {
        use CategoryKind::*;
        Some(match class {
            "tx-bwrkspeiseplan__hauptgerichte" => MainCourses,
            "tx-bwrkspeiseplan__beilagen" => SideDishes,
            "tx-bwrkspeiseplan__desserts" => Desserts,
            "tx-bwrkspeiseplan__salatsuppen" => SnacksSalads,
            "tx-bwrkspeiseplan__abendkarte" => EveningMenu,
            _ => None?,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            CategoryKind::MainCourses => "Hauptgerichte",
            CategoryKind::SideDishes => "Beilagen",
            CategoryKind::Desserts => "Desserts",
            CategoryKind::SnacksSalads => "Snacks, Salate (€/1kg)",
            CategoryKind::EveningMenu => "Abendkarte (ab 16:00)",
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Meal {
    pub name: String,
    /// at most one entry per role
    pub prices: Vec<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Meal {
    pub fn new(name: String, prices: Vec<Price>) -> Self {
        Self { name, prices, note: None }
    }

    pub fn price(&self, role: Role) -> Option<&Amount> {
        self.prices.iter()
            .find(|v| v.role == role)
        .map(|v| &v.amount)
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role { Student, Employee, Other }

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Employee, Role::Other];

    /// class of the price `span` inside a meal row
    pub fn class(self) -> &'static str {
        match self {
            Role::Student => "preise preis_typ1",
            Role::Employee => "preise preis_typ2",
            Role::Other => "preise preis_typ3",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Employee => "employee",
            Role::Other => "other",
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Price {
    pub role: Role,
    pub amount: Amount,
}

impl Price {
    pub fn new(role: Role, amount: Amount) -> Self {
        Self { role, amount }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount {
    eur: u32,
    cent: u8,
}

impl Amount {
    pub fn new(eur: u32, cent: u8) -> Option<Self> {
        (cent < 100).then_some(Self { eur, cent })
    }

    pub fn cents(&self) -> u64 {
        self.eur as u64 * 100 + self.cent as u64
    }

    /// Parses `4,50`, `4,5` or `4`; the comma is always the decimal separator.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (eur, cent) = s.split_once(',').unwrap_or((s, ""));

        if eur.is_empty() || !eur.bytes().all(|b| b.is_ascii_digit()) {
            tracing::trace!("could not parse price: '{s}'");
            return None;
        }
        let cent = match cent.len() {
            0 => 0,
            1 | 2 if cent.bytes().all(|b| b.is_ascii_digit()) => {
                let v: u8 = cent.parse().ok()?;
                if cent.len() == 1 { v * 10 } else { v }
            },
            _ => {
                tracing::trace!("price had malformed cents: '{s}'");
                return None;
            },
        };

        Self::new(eur.parse().ok()?, cent)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.eur, self.cent)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: serde::Serializer
    {
        serializer.collect_str(self)
    }
}
