//! Idempotent DDL applied at startup

pub const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS prekeybundle (
        userid varchar NOT NULL UNIQUE,
        registrationid integer NOT NULL,
        identitykey varchar NOT NULL,
        signedprekey varchar NOT NULL,
        signedprekey_id integer NOT NULL,
        sig_signedprekey varchar NOT NULL,
        deviceid integer NOT NULL DEFAULT 1,
        username varchar,
        picture integer
    )",
    "CREATE TABLE IF NOT EXISTS onetimeprekeys (
        opk varchar NOT NULL,
        opk_id integer NOT NULL,
        userid varchar NOT NULL REFERENCES prekeybundle (userid),
        UNIQUE (userid, opk_id)
    )",
    "CREATE TABLE IF NOT EXISTS journal_entries (
        id bigserial PRIMARY KEY,
        user_id varchar NOT NULL,
        created_at timestamptz NOT NULL DEFAULT now(),
        content text NOT NULL,
        content_grateful text,
        content_proud text,
        emotion_color text
    )",
    "CREATE TABLE IF NOT EXISTS moon_entries (
        id bigserial PRIMARY KEY,
        user_id varchar NOT NULL,
        created_at timestamptz NOT NULL DEFAULT now(),
        let_go jsonb,
        want jsonb,
        moon_sign text NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS relationship_check (
        id bigserial PRIMARY KEY,
        user_id varchar NOT NULL,
        created_at timestamptz NOT NULL DEFAULT now(),
        question text NOT NULL,
        answer text
    )",
    "CREATE TABLE IF NOT EXISTS profiles (
        id bigserial PRIMARY KEY,
        user_id varchar NOT NULL UNIQUE,
        username varchar(50) NOT NULL,
        avatar_url integer
    )",
    "CREATE INDEX IF NOT EXISTS journal_entries_owner_idx ON journal_entries (user_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS moon_entries_owner_idx ON moon_entries (user_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS relationship_check_owner_idx ON relationship_check (user_id, created_at DESC)",
];
