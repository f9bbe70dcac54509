mod difficulty;
