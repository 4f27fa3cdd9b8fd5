// Token authentication and threat scoring

pub mod jwt;
pub mod threat_detector;

pub use jwt::{Claims, TokenError, TokenService, TokenType};
pub use threat_detector::{ThreatAssessment, ThreatDetector, ThreatLog, ThreatSource};
