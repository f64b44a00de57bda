use fake::Fake;
use fake::faker::address::en::{
    BuildingNumber, SecondaryAddress, StateAbbr, StateName, StreetName, ZipCode,
};

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(StreetAddressGenerator));
    registry.register_generator(Box::new(FakeAddressGenerator {
        id: "Address.addressLine2",
        name: "Street Address Line 2",
        part: AddressPart::SecondaryAddress,
    }));
    registry.register_generator(Box::new(FakeAddressGenerator {
        id: "Address.state",
        name: "State",
        part: AddressPart::State,
    }));
    registry.register_generator(Box::new(FakeAddressGenerator {
        id: "Address.stateAbbreviation",
        name: "State Abbreviation",
        part: AddressPart::StateAbbreviation,
    }));
    registry.register_generator(Box::new(FakeAddressGenerator {
        id: "Address.zipCode",
        name: "Zip Code",
        part: AddressPart::ZipCode,
    }));
}

/// `<building number> <street name>`.
struct StreetAddressGenerator;

impl Generator for StreetAddressGenerator {
    fn id(&self) -> &'static str {
        "Address.streetAddress"
    }

    fn name(&self) -> &'static str {
        "Street Address"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let number: String = BuildingNumber().fake_with_rng(rng);
        let street: String = StreetName().fake_with_rng(rng);
        Ok(format!("{number} {street}"))
    }
}

#[derive(Clone, Copy)]
enum AddressPart {
    SecondaryAddress,
    State,
    StateAbbreviation,
    ZipCode,
}

struct FakeAddressGenerator {
    id: &'static str,
    name: &'static str,
    part: AddressPart,
}

impl Generator for FakeAddressGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let value = match self.part {
            AddressPart::SecondaryAddress => SecondaryAddress().fake_with_rng(rng),
            AddressPart::State => StateName().fake_with_rng(rng),
            AddressPart::StateAbbreviation => StateAbbr().fake_with_rng(rng),
            AddressPart::ZipCode => ZipCode().fake_with_rng(rng),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::generators::test_support::{generate, row};

    #[test]
    fn street_address_starts_with_a_number() {
        let value = generate("Address.streetAddress", None, &row(0, &[]), 11).expect("address");
        let (number, street) = value.split_once(' ').expect("two parts");
        assert!(number.chars().all(|ch| ch.is_ascii_digit()), "{value}");
        assert!(!street.is_empty());
    }

    #[test]
    fn state_abbreviation_is_two_letters() {
        for seed in 0..10 {
            let value = generate("Address.stateAbbreviation", None, &row(0, &[]), seed).expect("state");
            assert_eq!(value.len(), 2, "{value}");
        }
    }

    #[test]
    fn zip_codes_are_digits() {
        let value = generate("Address.zipCode", None, &row(0, &[]), 5).expect("zip");
        assert!(value.chars().all(|ch| ch.is_ascii_digit() || ch == '-'), "{value}");
    }
}
