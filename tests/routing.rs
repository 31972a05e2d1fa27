use std::borrow::Cow;

use facet::Facet;
use facet_formdata::{FormData, from_form, from_form_by_names, from_form_by_prefix, from_form_with};
use facet_testhelpers::test;

#[derive(Facet, Debug, PartialEq, Default)]
struct Person {
    name: String,
    age: u32,
}

#[test]
fn prefix_routing_strips_the_prefix_and_separator() {
    let form = FormData::from_urlencoded(
        "person.name=Ada&person.age=36&other.name=not-for-us&csrf_token=abc",
    );
    let person: Person = from_form(&form, "person").unwrap();
    assert_eq!(
        person,
        Person {
            name: "Ada".to_string(),
            age: 36
        }
    );
}

#[test]
fn prefix_match_needs_no_separator() {
    // an exact byte-prefix match: `personname` is accepted too
    let form = FormData::from_urlencoded("personname=Ada");
    let person: Person = from_form_by_prefix(&form, "person").unwrap();
    assert_eq!(person.name, "Ada");
}

#[test]
fn empty_prefix_binds_every_key() {
    let form = FormData::from_urlencoded("name=Ada&age=36");
    let person: Person = from_form(&form, "").unwrap();
    assert_eq!(person.age, 36);
}

#[test]
fn empty_prefix_does_not_trim_leading_separators() {
    // `.name` passes through unchanged, fails path parsing and is dropped
    let form = FormData::from_urlencoded(".name=Ada&name=Bo");
    let person: Person = from_form(&form, "").unwrap();
    assert_eq!(person.name, "Bo");
}

#[test]
fn a_key_equal_to_the_prefix_is_dropped() {
    // routes to the empty path, which parses to nothing usable
    let form = FormData::from_urlencoded("person=oops&person.name=Ada");
    let person: Person = from_form(&form, "person").unwrap();
    assert_eq!(person.name, "Ada");
}

#[test]
fn name_routing_accepts_listed_keys_verbatim() {
    let form = FormData::from_urlencoded("name=Ada&age=36&admin=true");
    let person: Person = from_form_by_names(&form, &["name", "age"]).unwrap();
    assert_eq!(person.name, "Ada");
    assert_eq!(person.age, 36);
}

#[test]
fn function_routing_can_rewrite_keys() {
    // form field names don't have to match the destination's field names
    fn rename(raw: &str) -> Option<Cow<'_, str>> {
        match raw {
            "full_name" => Some(Cow::Borrowed("name")),
            "years" => Some(Cow::Borrowed("age")),
            _ => None,
        }
    }

    let form = FormData::from_urlencoded("full_name=Ada&years=36");
    let person: Person = from_form_with(&form, rename).unwrap();
    assert_eq!(person.name, "Ada");
    assert_eq!(person.age, 36);
}

#[test]
fn fully_skipped_submission_yields_the_zero_value() {
    let form = FormData::from_urlencoded("a=1&b=2");
    let person: Person = from_form(&form, "nothing-starts-with-this").unwrap();
    assert_eq!(person, Person::default());
}
