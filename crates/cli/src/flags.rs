use crate::config::{EmbeddingMode, RerankMode};
use chunkit_search::Persona;
use clap::ValueEnum;

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum EmbedModeFlag {
    Http,
    Stub,
}

impl EmbedModeFlag {
    pub(crate) const fn as_domain(self) -> EmbeddingMode {
        match self {
            EmbedModeFlag::Http => EmbeddingMode::Http,
            EmbedModeFlag::Stub => EmbeddingMode::Stub,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum RerankFlag {
    Http,
    Bm25,
    Off,
}

impl RerankFlag {
    pub(crate) const fn as_domain(self) -> RerankMode {
        match self {
            RerankFlag::Http => RerankMode::Http,
            RerankFlag::Bm25 => RerankMode::Bm25,
            RerankFlag::Off => RerankMode::Off,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum PersonaFlag {
    General,
    Psychology,
    Fitness,
    Campus,
    Paper,
}

impl PersonaFlag {
    pub(crate) const fn as_domain(self) -> Persona {
        match self {
            PersonaFlag::General => Persona::General,
            PersonaFlag::Psychology => Persona::Psychology,
            PersonaFlag::Fitness => Persona::Fitness,
            PersonaFlag::Campus => Persona::Campus,
            PersonaFlag::Paper => Persona::Paper,
        }
    }
}
