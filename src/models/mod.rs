pub mod admin;
pub mod content;
pub mod message;
pub mod projet;
pub mod service;
pub mod visitor;

use serde::Serialize;
use thiserror::Error;

/// Valeur de statut inconnue lue en base ou reçue d'un formulaire
#[derive(Debug, Error)]
#[error("statut inconnu : {0}")]
pub struct UnknownStatus(pub String);

/// Compteurs du tableau de bord
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteTotals {
    pub contents: i64,
    pub services: i64,
    pub projets: i64,
    pub messages: i64,
    pub unread_messages: i64,
}
