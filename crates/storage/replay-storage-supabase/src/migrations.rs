//! SQL for the possessions table and its search function
//!
//! The batch ingestion scripts populate `worldcup_possessions`; search only
//! reads it through [`create_search_function`].

/// SQL to enable pgvector extension
pub const ENABLE_PGVECTOR: &str = "CREATE EXTENSION IF NOT EXISTS vector;";

/// SQL to create the possessions table
pub fn create_possessions_table(dimension: usize) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS worldcup_possessions (
          id bigserial PRIMARY KEY,
          timestamp_start_of_possession_seconds double precision NOT NULL
            CHECK (timestamp_start_of_possession_seconds >= 0),
          possession_details text,
          description text,
          embedding vector({})
        );
        "#,
        dimension
    )
}

/// SQL to create HNSW index for fast similarity search
pub const CREATE_HNSW_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS worldcup_possessions_embedding_hnsw_idx
    ON worldcup_possessions
    USING hnsw (embedding vector_cosine_ops);
"#;

/// SQL to create the `worldcup_possessions_search` function
pub fn create_search_function(dimension: usize) -> String {
    format!(
        r#"
        CREATE OR REPLACE FUNCTION worldcup_possessions_search(
          query_embedding vector({}),
          similarity_threshold float,
          match_count int
        )
        RETURNS TABLE (
          id bigint,
          timestamp_start_of_possession_seconds double precision,
          possession_details text,
          description text,
          similarity float
        )
        LANGUAGE plpgsql
        AS $$
        BEGIN
          RETURN QUERY
          SELECT
            p.id,
            p.timestamp_start_of_possession_seconds,
            p.possession_details,
            p.description,
            1 - (p.embedding <=> query_embedding) AS similarity
          FROM worldcup_possessions p
          WHERE
            p.embedding IS NOT NULL
            AND 1 - (p.embedding <=> query_embedding) > similarity_threshold
          ORDER BY p.embedding <=> query_embedding
          LIMIT match_count;
        END;
        $$;
        "#,
        dimension
    )
}

/// All statements in the order they must run
pub fn all(dimension: usize) -> Vec<String> {
    vec![
        ENABLE_PGVECTOR.to_string(),
        create_possessions_table(dimension),
        CREATE_HNSW_INDEX.to_string(),
        create_search_function(dimension),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations() {
        assert!(ENABLE_PGVECTOR.contains("vector"));

        let table = create_possessions_table(1536);
        assert!(table.contains("vector(1536)"));

        let func = create_search_function(1536);
        assert!(func.contains("worldcup_possessions_search"));
        assert!(func.contains("ORDER BY p.embedding <=> query_embedding"));
        assert!(func.contains("LIMIT match_count"));

        assert_eq!(all(1536).len(), 4);
    }
}
