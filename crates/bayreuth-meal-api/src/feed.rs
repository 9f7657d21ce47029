//! OpenMensa v2 feed output.

use std::io::{self, Cursor};

use quick_xml::{
    events::{BytesDecl, BytesText, Event},
    Writer,
};

use crate::processed::{Canteen, Category, Day, Meal};

pub const NAMESPACE: &str = "http://openmensa.org/open-mensa-v2";
pub const SCHEMA_LOCATION: &str =
    "http://openmensa.org/open-mensa-v2 http://openmensa.org/open-mensa-v2.xsd";
pub const OPENMENSA_VERSION: &str = "2.0";
pub const PARSER_VERSION: &str = "1.0";

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub fn to_xml(canteen: &Canteen) -> Result<String, FeedError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.create_element("openmensa")
        .with_attribute(("xmlns", NAMESPACE))
        .with_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"))
        .with_attribute(("xsi:schemaLocation", SCHEMA_LOCATION))
        .with_attribute(("version", OPENMENSA_VERSION))
    .write_inner_content(|w| {
        w.create_element("version")
            .write_text_content(BytesText::new(PARSER_VERSION))?;
        w.create_element("canteen")
            .write_inner_content(|w| {
                canteen.days().try_for_each(|day| write_day(w, day))
            })?;
        Ok::<_, io::Error>(())
    })?;

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn write_day(w: &mut XmlWriter, day: &Day) -> io::Result<()> {
    let date = day.date.format("%Y-%m-%d").to_string();
    w.create_element("day")
        .with_attribute(("date", date.as_str()))
    .write_inner_content(|w| {
        // a category needs at least one meal, a day at least one category
        let mut categories = day.categories.iter()
            .filter(|v| !v.meals.is_empty())
        .peekable();

        if categories.peek().is_none() {
            w.create_element("closed").write_empty()?;
            return Ok(());
        }
        categories.try_for_each(|v| write_category(w, v))
    })?;
    Ok(())
}

fn write_category(w: &mut XmlWriter, category: &Category) -> io::Result<()> {
    w.create_element("category")
        .with_attribute(("name", category.name.as_str()))
    .write_inner_content(|w| {
        category.meals.iter().try_for_each(|v| write_meal(w, v))
    })?;
    Ok(())
}

fn write_meal(w: &mut XmlWriter, meal: &Meal) -> io::Result<()> {
    w.create_element("meal").write_inner_content(|w| {
        w.create_element("name").write_text_content(BytesText::new(&meal.name))?;
        if let Some(note) = &meal.note {
            w.create_element("note").write_text_content(BytesText::new(note))?;
        }
        for price in &meal.prices {
            let amount = price.amount.to_string();
            w.create_element("price")
                .with_attribute(("role", price.role.as_str()))
            .write_text_content(BytesText::new(&amount))?;
        }
        Ok::<_, io::Error>(())
    })?;
    Ok(())
}
