use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::collections::HashMap;
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid, Database};
use crate::error::Result;
use crate::models::{Card, CardPatch, CardType, Tag};

impl Database {
    // ==================== CARD CREATE ====================

    pub fn insert_card(&self, card: &Card, user_id: Uuid) -> Result<()> {
        self.conn.execute(
            r#"INSERT INTO cards (
                id, type, title, content, color, x, y, user_id, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                card.id.to_string(),
                card.card_type.as_str(),
                card.title,
                card.content,
                card.color,
                card.x,
                card.y,
                user_id.to_string(),
                card.is_active as i32,
                format_timestamp(&card.created_at),
                format_timestamp(&card.updated_at),
            ],
        )?;
        Ok(())
    }

    // ==================== CARD READ ====================

    /// All cards of a user, newest first, with their tags attached.
    pub fn list_cards_for_user(&self, user_id: Uuid) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM cards WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )?;

        let mut cards = stmt
            .query_map([user_id.to_string()], Self::row_to_card)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut tags_by_card = self.tags_by_card_for_user(user_id)?;
        for card in &mut cards {
            if let Some(tags) = tags_by_card.remove(&card.id) {
                card.tags = tags;
            }
        }

        Ok(cards)
    }

    #[cfg(test)]
    pub fn get_card(&self, id: Uuid, user_id: Uuid) -> Result<Option<Card>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM cards WHERE id = ? AND user_id = ?")?;

        let result = stmt.query_row(params![id.to_string(), user_id.to_string()], Self::row_to_card);

        match result {
            Ok(mut card) => {
                card.tags = self.get_tags_for_card(card.id)?;
                Ok(Some(card))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn tags_by_card_for_user(&self, user_id: Uuid) -> Result<HashMap<Uuid, Vec<Tag>>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT ct.card_id, t.id, t.name, t.color, t.user_id
               FROM card_tags ct
               JOIN tags t ON t.id = ct.tag_id
               JOIN cards c ON c.id = ct.card_id
               WHERE c.user_id = ?
               ORDER BY t.rowid"#,
        )?;

        let rows = stmt
            .query_map([user_id.to_string()], |row| {
                let card_id: String = row.get(0)?;
                let tag = Self::row_to_tag_at(row, 1)?;
                Ok((parse_uuid(&card_id)?, tag))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut map: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for (card_id, tag) in rows {
            map.entry(card_id).or_default().push(tag);
        }
        Ok(map)
    }

    // ==================== CARD UPDATE ====================

    /// Write one field of a card together with its `updated_at`.
    pub fn update_card_field(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: &CardPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let id = id.to_string();
        let user_id = user_id.to_string();
        let updated_at = format_timestamp(&updated_at);

        let rows = match patch {
            CardPatch::Title(title) => self.conn.execute(
                "UPDATE cards SET title = ?, updated_at = ? WHERE id = ? AND user_id = ?",
                params![title, updated_at, id, user_id],
            )?,
            CardPatch::Content(content) => self.conn.execute(
                "UPDATE cards SET content = ?, updated_at = ? WHERE id = ? AND user_id = ?",
                params![content, updated_at, id, user_id],
            )?,
            CardPatch::Position { x, y } => self.conn.execute(
                "UPDATE cards SET x = ?, y = ?, updated_at = ? WHERE id = ? AND user_id = ?",
                params![x, y, updated_at, id, user_id],
            )?,
            CardPatch::Active(active) => self.conn.execute(
                "UPDATE cards SET is_active = ?, updated_at = ? WHERE id = ? AND user_id = ?",
                params![*active as i32, updated_at, id, user_id],
            )?,
        };
        Ok(rows > 0)
    }

    // ==================== CARD DELETE ====================

    /// Hard delete a card. Its tag associations go with it (via CASCADE).
    pub fn delete_card(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM cards WHERE id = ? AND user_id = ?",
            params![id.to_string(), user_id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ==================== ROW MAPPERS ====================

    fn row_to_card(row: &Row) -> rusqlite::Result<Card> {
        let id: String = row.get("id")?;
        let card_type: String = row.get("type")?;
        let user_id: String = row.get("user_id")?;
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;

        Ok(Card {
            id: parse_uuid(&id)?,
            card_type: CardType::parse(&card_type),
            title: row.get("title")?,
            content: row.get("content")?,
            color: row.get("color")?,
            x: row.get("x")?,
            y: row.get("y")?,
            is_active: row.get::<_, i32>("is_active")? == 1,
            user_id: Some(parse_uuid(&user_id)?),
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
            tags: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tag;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup() -> (Database, Uuid) {
        let db = Database::open_memory().unwrap();
        let user = db.upsert_user("ana@example.com").unwrap();
        (db, user.id)
    }

    #[test]
    fn test_insert_and_get_card() {
        let (db, user_id) = setup();
        let card = Card::new(CardType::Idea, 150.5, 210.25, Utc::now());
        db.insert_card(&card, user_id).unwrap();

        let stored = db.get_card(card.id, user_id).unwrap().unwrap();
        assert_eq!(stored.title, "Nuevo Idea");
        assert_eq!(stored.card_type, CardType::Idea);
        assert_eq!(stored.color, "#4ecdc4");
        assert_eq!(stored.x, 150.5);
        assert_eq!(stored.y, 210.25);
        assert!(stored.is_active);
        assert_eq!(stored.user_id, Some(user_id));
    }

    #[test]
    fn test_list_is_scoped_and_newest_first() {
        let (db, user_id) = setup();
        let other = db.upsert_user("bo@example.com").unwrap().id;

        let older = Card::new(CardType::Note, 0.0, 0.0, Utc::now() - chrono::Duration::seconds(60));
        let newer = Card::new(CardType::Task, 0.0, 0.0, Utc::now());
        let foreign = Card::new(CardType::Task, 0.0, 0.0, Utc::now());
        db.insert_card(&older, user_id).unwrap();
        db.insert_card(&newer, user_id).unwrap();
        db.insert_card(&foreign, other).unwrap();

        let cards = db.list_cards_for_user(user_id).unwrap();
        let ids: Vec<Uuid> = cards.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn test_update_single_field() {
        let (db, user_id) = setup();
        let card = Card::new(CardType::Note, 10.0, 20.0, Utc::now());
        db.insert_card(&card, user_id).unwrap();

        let later = Utc::now() + chrono::Duration::seconds(5);
        assert!(db
            .update_card_field(card.id, user_id, &CardPatch::Title("Plan".into()), later)
            .unwrap());
        assert!(db
            .update_card_field(card.id, user_id, &CardPatch::Active(false), later)
            .unwrap());

        let stored = db.get_card(card.id, user_id).unwrap().unwrap();
        assert_eq!(stored.title, "Plan");
        assert!(!stored.is_active);
        assert_eq!(stored.content, "");
        assert_eq!(stored.x, 10.0);
        assert!(stored.updated_at > card.updated_at);
    }

    #[test]
    fn test_update_other_users_card_is_noop() {
        let (db, user_id) = setup();
        let other = db.upsert_user("bo@example.com").unwrap().id;
        let card = Card::new(CardType::Note, 10.0, 20.0, Utc::now());
        db.insert_card(&card, user_id).unwrap();

        let changed = db
            .update_card_field(card.id, other, &CardPatch::Content("x".into()), Utc::now())
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_delete_cascades_associations() {
        let (db, user_id) = setup();
        let mut rng = StdRng::seed_from_u64(1);
        let card = Card::new(CardType::Project, 0.0, 0.0, Utc::now());
        let tag = Tag::new("urgent", &mut rng).unwrap();
        db.insert_card(&card, user_id).unwrap();
        db.insert_tag(&tag, user_id).unwrap();
        db.link_tag(card.id, tag.id).unwrap();

        assert!(db.delete_card(card.id, user_id).unwrap());
        assert!(db.get_card(card.id, user_id).unwrap().is_none());
        assert!(db.get_tags_for_card(card.id).unwrap().is_empty());
        // The tag itself survives
        assert_eq!(db.list_tags_for_user(user_id).unwrap().len(), 1);
        assert!(!db.delete_card(card.id, user_id).unwrap());
    }

    #[test]
    fn test_list_attaches_tags() {
        let (db, user_id) = setup();
        let mut rng = StdRng::seed_from_u64(2);
        let card = Card::new(CardType::Note, 0.0, 0.0, Utc::now());
        let a = Tag::new("a", &mut rng).unwrap();
        let b = Tag::new("b", &mut rng).unwrap();
        db.insert_card(&card, user_id).unwrap();
        db.insert_tag(&a, user_id).unwrap();
        db.insert_tag(&b, user_id).unwrap();
        db.link_tag(card.id, b.id).unwrap();

        let cards = db.list_cards_for_user(user_id).unwrap();
        assert_eq!(cards[0].tags.len(), 1);
        assert_eq!(cards[0].tags[0].name, "b");
    }
}
