use fake::Fake;
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::phone_number::en::PhoneNumber;
use rand::Rng;

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(EmailAddressGenerator));
    registry.register_generator(Box::new(PhoneNumberGenerator));
    registry.register_generator(Box::new(PhoneExtensionGenerator));
    registry.register_generator(Box::new(CompanyNameGenerator));
    registry.register_generator(Box::new(SsnGenerator));
}

struct EmailAddressGenerator;

impl Generator for EmailAddressGenerator {
    fn id(&self) -> &'static str {
        "Internet.emailAddress"
    }

    fn name(&self) -> &'static str {
        "Email Address"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        Ok(SafeEmail().fake_with_rng(rng))
    }
}

struct PhoneNumberGenerator;

impl Generator for PhoneNumberGenerator {
    fn id(&self) -> &'static str {
        "PhoneNumber.number"
    }

    fn name(&self) -> &'static str {
        "Phone Number"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        Ok(PhoneNumber().fake_with_rng(rng))
    }
}

/// Three to five random digits.
struct PhoneExtensionGenerator;

impl Generator for PhoneExtensionGenerator {
    fn id(&self) -> &'static str {
        "PhoneNumber.extension"
    }

    fn name(&self) -> &'static str {
        "Phone Number Extension"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let length = rng.random_range(3..=5);
        Ok((0..length).map(|_| random_digit(rng)).collect())
    }
}

struct CompanyNameGenerator;

impl Generator for CompanyNameGenerator {
    fn id(&self) -> &'static str {
        "Business.companyName"
    }

    fn name(&self) -> &'static str {
        "Company Name"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        Ok(CompanyName().fake_with_rng(rng))
    }
}

/// `AAA-GG-SSSS` with an area outside 000, 666 and 900-999, and non-zero
/// group and serial.
struct SsnGenerator;

impl Generator for SsnGenerator {
    fn id(&self) -> &'static str {
        "Identity.ssn"
    }

    fn name(&self) -> &'static str {
        "Social Security Number"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let mut area = rng.random_range(1..=898);
        if area >= 666 {
            area += 1;
        }
        let group = rng.random_range(1..=99);
        let serial = rng.random_range(1..=9999);
        Ok(format!("{area:03}-{group:02}-{serial:04}"))
    }
}

pub(crate) fn random_digit(rng: &mut dyn rand::RngCore) -> char {
    char::from(b'0' + rng.random_range(0..10u8))
}
