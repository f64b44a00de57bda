use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rand::Rng;

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(FirstNameGenerator));
    registry.register_generator(Box::new(LastNameGenerator));
    registry.register_generator(Box::new(FullNameGenerator));
    registry.register_generator(Box::new(MiddleInitialGenerator));
}

struct FirstNameGenerator;

impl Generator for FirstNameGenerator {
    fn id(&self) -> &'static str {
        "Name.firstName"
    }

    fn name(&self) -> &'static str {
        "First Name"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        Ok(FirstName().fake_with_rng(rng))
    }
}

struct LastNameGenerator;

impl Generator for LastNameGenerator {
    fn id(&self) -> &'static str {
        "Name.lastName"
    }

    fn name(&self) -> &'static str {
        "Last Name"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        Ok(LastName().fake_with_rng(rng))
    }
}

/// `First Last`, with a middle initial half of the time.
struct FullNameGenerator;

impl Generator for FullNameGenerator {
    fn id(&self) -> &'static str {
        "Name.fullName"
    }

    fn name(&self) -> &'static str {
        "Full Name"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let first: String = FirstName().fake_with_rng(rng);
        let last: String = LastName().fake_with_rng(rng);
        if rng.random_bool(0.5) {
            Ok(format!("{first} {}. {last}", random_initial(rng)))
        } else {
            Ok(format!("{first} {last}"))
        }
    }
}

struct MiddleInitialGenerator;

impl Generator for MiddleInitialGenerator {
    fn id(&self) -> &'static str {
        "Name.middleInitial"
    }

    fn name(&self) -> &'static str {
        "Middle Initial"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        Ok(random_initial(rng).to_string())
    }
}

fn random_initial(rng: &mut dyn rand::RngCore) -> char {
    char::from(b'A' + rng.random_range(0..26u8))
}

#[cfg(test)]
mod tests {
    use crate::generators::test_support::{generate, row};

    #[test]
    fn names_are_seed_deterministic() {
        let row = row(0, &[]);
        for key in ["Name.firstName", "Name.lastName", "Name.fullName"] {
            let first = generate(key, None, &row, 3).expect("name");
            let second = generate(key, None, &row, 3).expect("name");
            assert!(!first.is_empty());
            assert_eq!(first, second, "{key}");
        }
    }

    #[test]
    fn full_names_have_two_or_three_parts() {
        let row = row(0, &[]);
        for seed in 0..20 {
            let name = generate("Name.fullName", None, &row, seed).expect("name");
            let parts = name.split(' ').count();
            assert!(parts >= 2, "{name}");
        }
    }

    #[test]
    fn middle_initial_is_one_uppercase_letter() {
        let row = row(0, &[]);
        for seed in 0..20 {
            let initial = generate("Name.middleInitial", None, &row, seed).expect("initial");
            assert_eq!(initial.len(), 1);
            assert!(initial.chars().all(|ch| ch.is_ascii_uppercase()));
        }
    }
}
