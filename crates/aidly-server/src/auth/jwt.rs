use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    #[serde(rename = "type")]
    pub token_type: String,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetClaims {
    pub sub: Uuid,
    pub bot_id: Uuid,
    #[serde(rename = "type")]
    pub token_type: String,
    pub exp: i64,
}

pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn encode_access(&self, user_id: Uuid, ttl_minutes: i64) -> anyhow::Result<String> {
        let claims = AccessClaims {
            sub: user_id,
            token_type: "access".to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::minutes(ttl_minutes)).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    pub fn decode_access(&self, token: &str) -> anyhow::Result<AccessClaims> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &Validation::default())?;
        if data.claims.token_type != "access" {
            anyhow::bail!("not an access token");
        }
        Ok(data.claims)
    }

    pub fn encode_widget(&self, owner_id: Uuid, bot_id: Uuid, ttl_days: i64) -> anyhow::Result<String> {
        let claims = WidgetClaims {
            sub: owner_id,
            bot_id,
            token_type: "widget".to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::days(ttl_days)).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    pub fn decode_widget(&self, token: &str) -> anyhow::Result<WidgetClaims> {
        let data = decode::<WidgetClaims>(token, &self.decoding_key, &Validation::default())?;
        if data.claims.token_type != "widget" {
            anyhow::bail!("not a widget token");
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trips() {
        let codec = JwtCodec::new("test-secret");
        let user_id = Uuid::new_v4();
        let token = codec.encode_access(user_id, 60).unwrap();
        let claims = codec.decode_access(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn widget_token_round_trips() {
        let codec = JwtCodec::new("test-secret");
        let owner_id = Uuid::new_v4();
        let bot_id = Uuid::new_v4();
        let token = codec.encode_widget(owner_id, bot_id, 7).unwrap();
        let claims = codec.decode_widget(&token).unwrap();
        assert_eq!(claims.sub, owner_id);
        assert_eq!(claims.bot_id, bot_id);
    }

    #[test]
    fn access_token_rejected_as_widget() {
        let codec = JwtCodec::new("test-secret");
        let token = codec.encode_access(Uuid::new_v4(), 60).unwrap();
        assert!(codec.decode_widget(&token).is_err());
    }
}
