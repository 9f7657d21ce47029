//! Turns the operator's plan pages into [`Canteen`]s.
//!
//! Block selectors compare the whole `class` attribute, so the outer
//! `tx-bwrkspeiseplan__hauptgerichte` wrapper of a day page and the
//! `tx-bwrkspeiseplan__bar tx-bwrkspeiseplan__hauptgerichte` day bars of a
//! week page never match each other.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::{
    processed::{Amount, Canteen, Category, CategoryKind, Day, Meal, Price, Role},
    raw::{Snapshot, PLAN_PATH},
};

const MAIN_COURSES_CLASS: &str = "tx-bwrkspeiseplan__hauptgerichte";
const EVENING_MENU_CLASS: &str = "tx-bwrkspeiseplan__abendkarte";
const DAY_BAR_CLASS: &str = "tx-bwrkspeiseplan__bar tx-bwrkspeiseplan__hauptgerichte";

fn selector(s: &str) -> Selector {
    Selector::parse(s).expect("static selector")
}

fn block(class: &str) -> Selector {
    selector(&format!(r#"div[class="{class}"]"#))
}

static MAIN_COURSES: Lazy<Selector> = Lazy::new(|| block(MAIN_COURSES_CLASS));
static EVENING_MENU: Lazy<Selector> = Lazy::new(|| block(EVENING_MENU_CLASS));
static DAY_BAR: Lazy<Selector> = Lazy::new(|| block(DAY_BAR_CLASS));
static PLAN_LINK: Lazy<Selector> =
    Lazy::new(|| selector(&format!(r#"a[href*="{PLAN_PATH}"]"#)));

static DIV: Lazy<Selector> = Lazy::new(|| selector("div"));
static TABLE: Lazy<Selector> = Lazy::new(|| selector("table"));
static TBODY: Lazy<Selector> = Lazy::new(|| selector("tbody"));
static TR: Lazy<Selector> = Lazy::new(|| selector("tr"));
static TD: Lazy<Selector> = Lazy::new(|| selector("td"));

/// price spans in `Role::ALL` order
static PRICES: Lazy<[Selector; 3]> = Lazy::new(|| {
    Role::ALL.map(|role| selector(&format!(r#"span[class="{}"]"#, role.class())))
});

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("meal row in \"{category}\" has no {cell} cell")]
    MissingCell {
        category: &'static str,
        cell: &'static str,
    },
}

pub fn canteen_today(snapshot: &Snapshot, date: NaiveDate) -> Result<Canteen, ExtractError> {
    Ok(Canteen::new(vec![day(&snapshot.document(), date)?]))
}

/// Concatenates the days of each week page in the given order; dates
/// are neither deduplicated nor sorted.
pub fn canteen_weeks<'a>(
    snapshots: impl IntoIterator<Item = &'a Snapshot>,
) -> Result<Canteen, ExtractError> {
    let mut days = Vec::new();
    for snapshot in snapshots {
        days.extend(week(&snapshot.document())?);
    }
    Ok(Canteen::new(days))
}

/// Parses a day page. The evening menu block only exists on day pages.
pub fn day(doc: &Html, date: NaiveDate) -> Result<Day, ExtractError> {
    let mut categories = Vec::new();

    for selector in [&*MAIN_COURSES, &*EVENING_MENU] {
        if let Some(block) = doc.select(selector).next() {
            categories.extend(categories_of(block)?);
        }
    }

    Ok(Day::new(date, categories))
}

/// Parses a week page. Day bars without a date link are skipped.
pub fn week(doc: &Html) -> Result<Vec<Day>, ExtractError> {
    let mut days = Vec::new();

    for bar in doc.select(&DAY_BAR) {
        let Some(date) = bar_date(bar) else {
            tracing::debug!("skipping day bar without date link");
            continue;
        };
        days.push(Day::new(date, categories_of(bar)?));
    }

    Ok(days)
}

/// First link pointing at a plan page whose file name is an ISO date.
fn bar_date(bar: ElementRef<'_>) -> Option<NaiveDate> {
    bar.select(&PLAN_LINK)
        .filter_map(|el| el.value().attr("href"))
    .find_map(date_from_href)
}

fn date_from_href(href: &str) -> Option<NaiveDate> {
    let file = href.rsplit('/').next()?;
    let stem = &file[..file.rfind('.')?];
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

/// Category blocks sit at `div/div/div` below a day block.
fn categories_of(block: ElementRef<'_>) -> Result<Vec<Category>, ExtractError> {
    let mut categories = Vec::new();

    let nodes = children(block, &DIV)
        .flat_map(|v| children(v, &DIV))
        .flat_map(|v| children(v, &DIV));

    for node in nodes {
        let class = node.value().attr("class").unwrap_or_default();
        let Some(kind) = CategoryKind::from_class(class) else {
            tracing::trace!("ignoring block with class '{class}'");
            continue;
        };

        let meals = children(node, &TABLE)
            .flat_map(|v| children(v, &TBODY))
            .flat_map(|v| children(v, &TR))
            .map(|row| meal(kind, row))
        .collect::<Result<Vec<_>, _>>()?;

        categories.push(Category::new(kind, meals));
    }

    Ok(categories)
}

fn meal(kind: CategoryKind, row: ElementRef<'_>) -> Result<Meal, ExtractError> {
    let mut cells = children(row, &TD);
    let missing = |cell| ExtractError::MissingCell { category: kind.name(), cell };

    let name = cells.next().ok_or_else(|| missing("name"))?;
    let prices = cells.next().ok_or_else(|| missing("price"))?;

    let prices = Role::ALL.into_iter()
        .zip(PRICES.iter())
        .filter_map(|(role, span)| price(prices, role, span))
    .collect();

    Ok(Meal::new(direct_text(name).trim().to_string(), prices))
}

/// Absent or unreadable prices only drop that role.
fn price(cell: ElementRef<'_>, role: Role, span: &Selector) -> Option<Price> {
    let span = children(cell, span).next()?;

    let text = direct_text(span);
    // label first, e.g. "Stud. 2,70"
    let Some((_, value)) = text.trim().split_once(' ') else {
        tracing::debug!("no price label in '{}' ({})", text.trim(), role.as_str());
        return None;
    };

    let amount = Amount::parse(value);
    if amount.is_none() {
        tracing::debug!("dropping malformed {} price '{value}'", role.as_str());
    }
    amount.map(|amount| Price::new(role, amount))
}

/// Direct children matching `selector`; `select` would also descend.
fn children<'a, 's>(
    el: ElementRef<'a>, selector: &'s Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 's
where 'a: 's
{
    el.children()
        .filter_map(ElementRef::wrap)
    .filter(move |v| selector.matches(v))
}

fn direct_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|v| v.value().as_text())
    .map(|v| &**v)
    .collect()
}
