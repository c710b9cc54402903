//! Génère le hash bcrypt d'un mot de passe administrateur pour le fichier `.env`.

use bcrypt::hash;
use std::env;

/// Même coût que celui utilisé par le serveur
const HASH_COST: u32 = 10;

fn main() {
    let password = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage : cargo run --bin hash-password <MOT_DE_PASSE>");
        std::process::exit(1);
    });

    match hash(&password, HASH_COST) {
        Ok(hashed) => {
            println!("\nCoût : {}", HASH_COST);
            println!("Hash : {}\n", hashed);
            println!("# À copier dans le fichier .env :");
            println!("ADMIN_HASH_PASSWORD={}", hashed);
        }
        Err(e) => {
            eprintln!("Erreur lors du hachage : {}", e);
            std::process::exit(1);
        }
    }
}
