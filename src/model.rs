/// Module that abstracts the persistence model.
///
/// The protocol front-end reads two tables and writes none:
///
///   accounts("guid" int, "username" varchar, "sessionKey" varchar)
///   characters("guid" bigint, "account" int, "online" smallint)
///
/// The session key is stored as a hex string by the upstream auth stage.
pub mod entity;
pub mod repository;
