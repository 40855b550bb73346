//! Property assignment and validation on live elements

mod common;

use common::{string_list, Schemas};
use samyama_ogm::element::{SlotValue, VertexPropertyManager};
use samyama_ogm::{
    DataType, Edge, Element, ElementSchema, OgmError, Property, PropertyValue, Vertex,
};

#[test]
fn test_set_change_property() {
    let s = Schemas::new();
    let mut person = Vertex::new(&s.person).unwrap();
    assert!(person.get("name").is_none());
    person.set("name", "leif").unwrap();
    assert_eq!(person.get("name"), Some(&"leif".into()));
    person.set("name", "leifur").unwrap();
    assert_eq!(person.get("name"), Some(&"leifur".into()));

    let mut lives_in = Edge::new(&s.lives_in).unwrap();
    assert!(lives_in.get("notes").is_none());
    lives_in.set("notes", "notable").unwrap();
    assert_eq!(lives_in.get("notes"), Some(&"notable".into()));
}

#[test]
fn test_property_default() {
    let s = Schemas::new();
    let mut knows = Edge::new(&s.knows).unwrap();
    assert_eq!(knows.get("notes"), Some(&"N/A".into()));
    knows.set("notes", "notable").unwrap();
    assert_eq!(knows.get("notes"), Some(&"notable".into()));
}

#[test]
fn test_false_bool_default() {
    let s = Schemas::new();
    let place = Vertex::new(&s.place).unwrap();
    let incorporated = place.vertex_property("incorporated").unwrap();
    assert_eq!(incorporated.as_single().unwrap().value(), &PropertyValue::Boolean(false));
}

#[test]
fn test_validation_keeps_previous_value() {
    let s = Schemas::new();
    let mut person = Vertex::new(&s.person).unwrap();
    person.set("age", 10).unwrap();
    let err = person.set("age", "hello").unwrap_err();
    assert!(matches!(err, OgmError::Validation(_)));
    assert_eq!(person.get("age"), Some(&PropertyValue::Integer(10)));
}

#[test]
fn test_set_id_widens_to_long() {
    let s = Schemas::new();
    let mut person = Vertex::new(&s.person).unwrap();
    person.set_id(PropertyValue::Integer(1)).unwrap();
    assert!(matches!(person.id(), Some(PropertyValue::Long(1))));
}

#[test]
fn test_type_level_id_is_element_error() {
    let s = Schemas::new();
    assert!(matches!(s.person.attribute("id"), Err(OgmError::Element(_))));
}

#[test]
fn test_single_vertex_property() {
    let s = Schemas::new();
    let mut person = Vertex::new(&s.person).unwrap();
    assert!(person.vertex_property("birthplace").is_none());

    person.set("birthplace", "Iowa City").unwrap();
    assert_eq!(person.get("birthplace"), Some(&"Iowa City".into()));
    person.set("birthplace", "U of I Hospital").unwrap();
    assert_eq!(person.get("birthplace"), Some(&"U of I Hospital".into()));

    person.set("birthplace", 1).unwrap();
    assert_eq!(person.get("birthplace"), Some(&"1".into()));
}

#[test]
fn test_list_cardinality_vertex_property() {
    let s = Schemas::new();
    let mut person = Vertex::new(&s.person).unwrap();
    assert!(person.vertex_property("nicknames").is_none());

    person.set("nicknames", "sly").unwrap();
    let nicknames = person.vertex_property("nicknames").unwrap().as_list().unwrap();
    assert_eq!(nicknames.len(), 1);
    assert_eq!(nicknames[0].value(), &PropertyValue::from("sly"));

    person.set("nicknames", SlotValue::set(["sly", "guy"])).unwrap();
    let nicknames = person.vertex_property("nicknames").unwrap();
    assert!(nicknames.by_value(&"sly".into()).is_some());
    assert!(nicknames.by_value(&"guy".into()).is_some());

    person
        .set("nicknames", SlotValue::list(["sly", "big", "guy", "guy"]))
        .unwrap();
    let nicknames = person.vertex_property("nicknames").unwrap().as_list().unwrap();
    assert_eq!(nicknames.values(), string_list(&["sly", "big", "guy", "guy"]));
    assert_eq!(nicknames.all_by_value(&"guy".into()).len(), 2);

    let nicknames = person
        .vertex_property_mut("nicknames")
        .unwrap()
        .as_list_mut()
        .unwrap();
    nicknames.append(1).unwrap();
    assert_eq!(nicknames.by_value(&"1".into()).unwrap().value(), &PropertyValue::from("1"));
}

#[test]
fn test_list_cardinality_coerces_members() {
    let s = Schemas::new();
    let mut person = Vertex::new(&s.person).unwrap();
    person
        .set(
            "nicknames",
            vec![
                PropertyValue::from(1),
                PropertyValue::from(1.5),
                PropertyValue::from(2),
            ],
        )
        .unwrap();
    assert_eq!(
        person.vertex_property("nicknames").unwrap().values(),
        string_list(&["1", "1.5", "2"])
    );
}

#[test]
fn test_set_cardinality_vertex_property() {
    let s = Schemas::new();
    let mut place = Vertex::new(&s.place).unwrap();
    assert!(place.vertex_property("important_numbers").is_none());

    place.set("important_numbers", 1).unwrap();
    let numbers = place.vertex_property("important_numbers").unwrap().as_set().unwrap();
    assert_eq!(numbers.len(), 1);
    assert!(numbers.contains(&PropertyValue::Integer(1)));

    place
        .set("important_numbers", SlotValue::list([1, 2, 2]))
        .unwrap();
    let numbers = place
        .vertex_property_mut("important_numbers")
        .unwrap()
        .as_set_mut()
        .unwrap();
    assert_eq!(numbers.len(), 2);

    assert!(numbers.add(3).unwrap());
    assert!(!numbers.add(3).unwrap());
    assert_eq!(numbers.len(), 3);
    assert!(matches!(numbers.add("dude"), Err(OgmError::Validation(_))));
    assert_eq!(numbers.len(), 3);
}

#[test]
fn test_set_union_keeps_existing_members() {
    let s = Schemas::new();
    let mut place = Vertex::new(&s.place).unwrap();
    place
        .set("important_numbers", SlotValue::set([1, 2, 3]))
        .unwrap();
    let union = place
        .vertex_property("important_numbers")
        .unwrap()
        .as_set()
        .unwrap()
        .union([3, 4, 5]);
    place.set("important_numbers", union).unwrap();

    let mut values: Vec<i64> = place
        .vertex_property("important_numbers")
        .unwrap()
        .values()
        .iter()
        .filter_map(PropertyValue::as_i64)
        .collect();
    values.sort_unstable();
    assert_eq!(values, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_set_keeps_64bit_integers() {
    let s = Schemas::new();
    let mut place = Vertex::new(&s.place).unwrap();
    place
        .set("important_numbers", SlotValue::set([1i64, 2, 3]))
        .unwrap();
    let slot = place.vertex_property("important_numbers").unwrap();
    assert!(slot
        .members()
        .iter()
        .all(|vp| matches!(vp.value(), PropertyValue::Long(_))));
}

#[test]
fn test_set_validation_is_all_or_nothing() {
    let s = Schemas::new();
    let mut place = Vertex::new(&s.place).unwrap();
    place.set("important_numbers", SlotValue::set([7])).unwrap();
    let result = place.set(
        "important_numbers",
        vec![PropertyValue::from("hello"), 2.into(), 3.into()],
    );
    assert!(matches!(result, Err(OgmError::Validation(_))));
    assert_eq!(
        place.vertex_property("important_numbers").unwrap().values(),
        vec![PropertyValue::Integer(7)]
    );
}

#[test]
fn test_edge_cannot_declare_vertex_property() {
    let result = ElementSchema::edge("MyEdge")
        .property("vert_prop", Property::vertex_property(DataType::String))
        .build();
    assert!(matches!(result, Err(OgmError::Mapping(_))));
}

#[test]
fn test_metaproperties() {
    let s = Schemas::new();
    let mut place = Vertex::new(&s.place).unwrap();
    place
        .set("historical_name", SlotValue::list(["hispania", "al-andalus"]))
        .unwrap();

    let names = place.vertex_property_mut("historical_name").unwrap();
    let mut hispania = names.by_value_mut(&"hispania".into()).unwrap();
    hispania.set("notes", "roman rule").unwrap();
    hispania.set("year", 300).unwrap();
    let mut andalus = names.by_value_mut(&"al-andalus".into()).unwrap();
    andalus.set("notes", "muslim rule").unwrap();
    andalus.set("year", 700).unwrap();

    let names = place.vertex_property("historical_name").unwrap();
    let hispania = names.by_value(&"hispania".into()).unwrap();
    assert_eq!(hispania.get("notes"), Some(&"roman rule".into()));
    assert_eq!(hispania.get("year"), Some(&PropertyValue::Integer(300)));
    let andalus = names.by_value(&"al-andalus".into()).unwrap();
    assert_eq!(andalus.get("year"), Some(&PropertyValue::Integer(700)));
}

#[test]
fn test_metaproperty_validation() {
    let s = Schemas::new();
    let mut place = Vertex::new(&s.place).unwrap();
    place.set("historical_name", SlotValue::list(["spain"])).unwrap();
    let mut spain = place
        .vertex_property_mut("historical_name")
        .unwrap()
        .by_value_mut(&"spain".into())
        .unwrap();
    assert!(matches!(spain.set("year", "hello"), Err(OgmError::Validation(_))));
}

#[test]
fn test_inherited_declarations() {
    let s = Schemas::new();
    assert_eq!(s.inherited.label(), "inherited");
    assert_eq!(s.inherited.attribute("age").unwrap(), "custom__person__age");

    let mut v = Vertex::new(&s.inherited).unwrap();
    v.set("name", "heir").unwrap();
    v.set("nicknames", SlotValue::list(["junior"])).unwrap();
    assert_eq!(v.get("name"), Some(&"heir".into()));
    assert_eq!(v.vertex_property("nicknames").unwrap().len(), 1);
}

#[test]
fn test_dict_round_trip_keeps_metaproperties() {
    let s = Schemas::new();
    let mut person = Vertex::new(&s.person).unwrap();
    person.set("name", "dave").unwrap();
    person.set("age", 36).unwrap();
    person
        .set("location", SlotValue::list(["Iowa City", "Seattle"]))
        .unwrap();
    person
        .vertex_property_mut("location")
        .unwrap()
        .by_value_mut(&"Seattle".into())
        .unwrap()
        .set("year", 2015)
        .unwrap();

    let dict = person.to_dict();
    assert_eq!(dict["label"], "person");
    assert_eq!(dict["type"], "vertex");
    assert_eq!(dict["location"][1]["year"], 2015);

    let copy = Vertex::from_dict(&s.person, &dict).unwrap();
    assert_eq!(copy.get("name"), Some(&"dave".into()));
    assert_eq!(copy.get("age"), Some(&PropertyValue::Integer(36)));
    let seattle = copy
        .vertex_property("location")
        .unwrap()
        .by_value(&"Seattle".into())
        .unwrap()
        .get("year")
        .cloned();
    assert_eq!(seattle, Some(PropertyValue::Integer(2015)));
}
