use rand::Rng;

pub const RESERVATION_CODE_LENGTH: usize = 6;

const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Source of customer-facing reservation codes.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws every character independently from the thread RNG.
///
/// Uniqueness is left to the database constraint; with 36^6 possible codes a
/// collision is rare enough to surface as a retryable failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        generate_reservation_code(&mut rand::thread_rng())
    }
}

pub fn generate_reservation_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..RESERVATION_CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn is_valid_reservation_code(code: &str) -> bool {
    code.len() == RESERVATION_CODE_LENGTH
        && code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_codes_are_well_formed() {
        let generator = RandomCodeGenerator;
        for _ in 0..500 {
            let code = generator.generate();
            assert!(is_valid_reservation_code(&code), "bad code {code}");
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = generate_reservation_code(&mut StdRng::seed_from_u64(7));
        let b = generate_reservation_code(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_validation_rejects_lowercase_and_length() {
        assert!(is_valid_reservation_code("AB12CD"));
        assert!(!is_valid_reservation_code("ab12cd"));
        assert!(!is_valid_reservation_code("AB12C"));
        assert!(!is_valid_reservation_code("AB12CD7"));
        assert!(!is_valid_reservation_code("AB-2CD"));
    }
}
