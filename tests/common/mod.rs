//! Shared element types for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use samyama_ogm::{
    Cardinality, DataType, ElementSchema, EmbeddedClient, Ogm, OgmConfig, Property,
    PropertyValue,
};

pub fn db_name_factory(name: &str, label: &str) -> String {
    format!("{}__{}", label, name)
}

pub struct Schemas {
    pub location: Arc<ElementSchema>,
    pub historical_name: Arc<ElementSchema>,
    pub person: Arc<ElementSchema>,
    pub inherited: Arc<ElementSchema>,
    pub place: Arc<ElementSchema>,
    pub knows: Arc<ElementSchema>,
    pub lives_in: Arc<ElementSchema>,
}

impl Schemas {
    pub fn new() -> Self {
        let location = ElementSchema::vertex_property("Location")
            .property("year", Property::new(DataType::Integer))
            .build()
            .unwrap();

        let historical_name = ElementSchema::vertex_property("HistoricalName")
            .property("notes", Property::new(DataType::String))
            .property("year", Property::new(DataType::Integer))
            .build()
            .unwrap();

        let person = ElementSchema::vertex("Person")
            .property("name", Property::new(DataType::String))
            .property(
                "age",
                Property::new(DataType::Integer).db_name("custom__person__age"),
            )
            .property("birthplace", Property::vertex_property(DataType::String))
            .property(
                "location",
                Property::vertex_property(DataType::String)
                    .with_schema(location.clone())
                    .cardinality(Cardinality::List),
            )
            .property(
                "nicknames",
                Property::vertex_property(DataType::String)
                    .cardinality(Cardinality::List)
                    .db_name_factory(db_name_factory),
            )
            .build()
            .unwrap();

        let inherited = ElementSchema::vertex("Inherited")
            .extends(&person)
            .build()
            .unwrap();

        let place = ElementSchema::vertex("Place")
            .property("name", Property::new(DataType::String))
            .property(
                "zipcode",
                Property::new(DataType::Integer).db_name_factory(db_name_factory),
            )
            .property(
                "historical_name",
                Property::vertex_property(DataType::String)
                    .with_schema(historical_name.clone())
                    .cardinality(Cardinality::List),
            )
            .property(
                "important_numbers",
                Property::vertex_property(DataType::Integer).cardinality(Cardinality::Set),
            )
            .property(
                "incorporated",
                Property::vertex_property(DataType::Boolean).default(false),
            )
            .build()
            .unwrap();

        let knows = ElementSchema::edge("Knows")
            .label("knows")
            .property("notes", Property::new(DataType::String).default("N/A"))
            .build()
            .unwrap();

        let lives_in = ElementSchema::edge("LivesIn")
            .property("notes", Property::new(DataType::String))
            .build()
            .unwrap();

        Self {
            location,
            historical_name,
            person,
            inherited,
            place,
            knows,
            lives_in,
        }
    }

    pub fn all(&self) -> Vec<Arc<ElementSchema>> {
        vec![
            self.location.clone(),
            self.historical_name.clone(),
            self.person.clone(),
            self.inherited.clone(),
            self.place.clone(),
            self.knows.clone(),
            self.lives_in.clone(),
        ]
    }
}

/// Application over a fresh embedded graph with every fixture type registered
pub fn app() -> (Ogm, Arc<EmbeddedClient>, Schemas) {
    let client = Arc::new(EmbeddedClient::new());
    let schemas = Schemas::new();
    let mut app = Ogm::new(client.clone(), OgmConfig::default());
    app.register(schemas.all());
    (app, client, schemas)
}

pub fn string_list(values: &[&str]) -> Vec<PropertyValue> {
    values.iter().map(|v| PropertyValue::from(*v)).collect()
}
