//! Wire models of the car registry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schema::{ApiSchema, Schema, SchemaRegistry};

const COLOR_DESCRIPTION: &str = "The color of the car, included to demonstrate enums";
const PRODUCTION_YEAR_DESCRIPTION: &str = "The production year of the car, included to demonstrate dates";
const NICK_NAME_DESCRIPTION: &str =
    "The nickname of the car, included to demonstrate nullables and default values";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
    Black,
    White,
    Beige,
}

impl Color {
    pub const ALL: [Color; 7] = [
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::Black,
        Color::White,
        Color::Beige,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Color::Red    => "RED",
            Color::Blue   => "BLUE",
            Color::Green  => "GREEN",
            Color::Yellow => "YELLOW",
            Color::Black  => "BLACK",
            Color::White  => "WHITE",
            Color::Beige  => "BEIGE",
        }
    }
}

impl ApiSchema for Color {
    fn schema(registry: &mut SchemaRegistry) -> Schema {
        registry.named::<Self>(|_| Schema::string_enum(Color::ALL.iter().map(|c| c.as_str())))
    }
}

/// A car as stored in the system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub id: String,
    pub color: Color,
    pub production_year: NaiveDate,
    pub nick_name: Option<String>,
}

impl ApiSchema for Car {
    fn schema(registry: &mut SchemaRegistry) -> Schema {
        registry.named::<Self>(|registry| {
            Schema::object()
                .with_description("A car as stored in the system")
                .required_property(
                    "id",
                    Schema::string()
                        .with_description("The system ID of a car, by which it can be retrieved or deleted"),
                )
                .required_property("color", Color::schema(registry))
                .required_property(
                    "productionYear",
                    NaiveDate::schema(registry).with_description(PRODUCTION_YEAR_DESCRIPTION),
                )
                .required_property(
                    "nickName",
                    Option::<String>::schema(registry).with_description(NICK_NAME_DESCRIPTION),
                )
        })
    }
}

/// Details of a car to be created, or to replace a stored car's data.
///
/// Unknown fields are rejected, so a caller cannot choose the id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCar {
    pub color: Color,
    pub production_year: NaiveDate,
    #[serde(default)]
    pub nick_name: Option<String>,
}

impl NewCar {
    pub fn with_id(self, id: impl Into<String>) -> Car {
        Car {
            id: id.into(),
            color: self.color,
            production_year: self.production_year,
            nick_name: self.nick_name,
        }
    }
}

impl ApiSchema for NewCar {
    fn schema(registry: &mut SchemaRegistry) -> Schema {
        registry.named::<Self>(|registry| {
            // `$ref` siblings are ignored in OpenAPI 3.0, so the enum's description sits on the object.
            Schema::object()
                .with_description(&format!("Details of a car to be created. color: {COLOR_DESCRIPTION}"))
                .required_property("color", Color::schema(registry))
                .required_property(
                    "productionYear",
                    NaiveDate::schema(registry).with_description(PRODUCTION_YEAR_DESCRIPTION),
                )
                .property(
                    "nickName",
                    Option::<String>::schema(registry).with_description(NICK_NAME_DESCRIPTION),
                )
                .closed()
        })
    }
}

/// Path parameters selecting one car.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CarId {
    pub id: String,
}

impl ApiSchema for CarId {
    fn schema(_: &mut SchemaRegistry) -> Schema {
        Schema::object().required_property("id", Schema::string().with_description("The ID of a car."))
    }
}

/// Query parameters filtering the car listing by color.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CarFilter {
    #[serde(default)]
    pub color: Vec<Color>,
}

impl ApiSchema for CarFilter {
    fn schema(registry: &mut SchemaRegistry) -> Schema {
        Schema::object().property(
            "color",
            Vec::<Color>::schema(registry).with_description(
                "The colors to retrieve cars for. Optional. If omitted, all cars will be retrieved.",
            ),
        )
    }
}

/// Path parameters of the greeting routes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NameParam {
    pub name: String,
}

impl ApiSchema for NameParam {
    fn schema(_: &mut SchemaRegistry) -> Schema {
        Schema::object().required_property(
            "name",
            Schema::string().with_description("The name which will be used in the hello-response."),
        )
    }
}
