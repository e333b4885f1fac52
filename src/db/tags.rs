use rusqlite::{params, Row};
use uuid::Uuid;

use super::{parse_uuid, Database};
use crate::error::Result;
use crate::models::Tag;

impl Database {
    pub fn insert_tag(&self, tag: &Tag, user_id: Uuid) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tags (id, name, color, user_id) VALUES (?, ?, ?, ?)",
            params![tag.id.to_string(), tag.name, tag.color, user_id.to_string()],
        )?;
        Ok(())
    }

    /// Tags of a user in creation order
    pub fn list_tags_for_user(&self, user_id: Uuid) -> Result<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color, user_id FROM tags WHERE user_id = ? ORDER BY rowid")?;

        let tags = stmt
            .query_map([user_id.to_string()], |row| Self::row_to_tag_at(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tags)
    }

    /// Get tags for a card
    #[cfg(test)]
    pub fn get_tags_for_card(&self, card_id: Uuid) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT t.id, t.name, t.color, t.user_id
               FROM tags t
               JOIN card_tags ct ON ct.tag_id = t.id
               WHERE ct.card_id = ?
               ORDER BY t.rowid"#,
        )?;

        let tags = stmt
            .query_map([card_id.to_string()], |row| Self::row_to_tag_at(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tags)
    }

    // ==================== CARD_TAGS ====================

    pub fn link_tag(&self, card_id: Uuid, tag_id: Uuid) -> Result<()> {
        self.conn.execute(
            "INSERT INTO card_tags (card_id, tag_id) VALUES (?, ?)",
            params![card_id.to_string(), tag_id.to_string()],
        )?;
        Ok(())
    }

    pub fn unlink_tag(&self, card_id: Uuid, tag_id: Uuid) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM card_tags WHERE card_id = ? AND tag_id = ?",
            params![card_id.to_string(), tag_id.to_string()],
        )?;
        Ok(rows > 0)
    }

    /// Map a tag whose four columns (id, name, color, user_id) start at `offset`
    pub(super) fn row_to_tag_at(row: &Row, offset: usize) -> rusqlite::Result<Tag> {
        let id: String = row.get(offset)?;
        let user_id: String = row.get(offset + 3)?;
        Ok(Tag {
            id: parse_uuid(&id)?,
            name: row.get(offset + 1)?,
            color: row.get(offset + 2)?,
            user_id: Some(parse_uuid(&user_id)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Card, CardType};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_tags_listed_in_creation_order() {
        let db = Database::open_memory().unwrap();
        let user_id = db.upsert_user("ana@example.com").unwrap().id;
        let mut rng = StdRng::seed_from_u64(3);

        for name in ["zeta", "alpha", "mid"] {
            db.insert_tag(&Tag::new(name, &mut rng).unwrap(), user_id).unwrap();
        }

        let names: Vec<String> = db
            .list_tags_for_user(user_id)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_link_and_unlink() {
        let db = Database::open_memory().unwrap();
        let user_id = db.upsert_user("ana@example.com").unwrap().id;
        let mut rng = StdRng::seed_from_u64(4);
        let card = Card::new(CardType::Idea, 0.0, 0.0, Utc::now());
        let tag = Tag::new("later", &mut rng).unwrap();
        db.insert_card(&card, user_id).unwrap();
        db.insert_tag(&tag, user_id).unwrap();

        db.link_tag(card.id, tag.id).unwrap();
        assert_eq!(db.get_tags_for_card(card.id).unwrap().len(), 1);
        // Duplicate association violates the primary key
        assert!(db.link_tag(card.id, tag.id).is_err());

        assert!(db.unlink_tag(card.id, tag.id).unwrap());
        assert!(!db.unlink_tag(card.id, tag.id).unwrap());
        assert!(db.get_tags_for_card(card.id).unwrap().is_empty());
    }
}
