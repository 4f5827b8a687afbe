mod controller;
mod runner;
mod scenarios;
