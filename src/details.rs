use std::collections::HashMap;

use serde_json::json;

use crate::conversation::ToolSpec;

pub const DETAIL_TOOL_NAME: &str = "get_summary_by_title";

const CURATED_SUMMARIES: &[(&str, &str)] = &[
    (
        "1984",
        "George Orwell's novel describes a dystopian society under total state control. \
People are constantly watched by 'Big Brother,' and free thought is considered a crime. \
Winston Smith, the main character, tries to resist this oppressive regime. \
It is a story about freedom, truth, and ideological manipulation. The novel explores \
themes of surveillance, propaganda, and the individual's struggle against totalitarian power.",
    ),
    (
        "The Hobbit",
        "Bilbo Baggins, a comfortable hobbit with no adventures, is taken by surprise \
when he is invited on a quest to recover the dwarves' treasure guarded by the dragon Smaug. \
Along the way, he discovers courage and inner resources he never knew he had. \
The story is full of fantastic creatures, unexpected friendships, and tense moments. \
It's a tale of personal growth, adventure, and discovering one's true potential.",
    ),
    (
        "To Kill a Mockingbird",
        "Harper Lee's masterpiece set in 1930s Alabama follows Scout Finch as she grows up \
in a racially divided town. Her father, lawyer Atticus Finch, defends a black man \
falsely accused of rape, teaching valuable lessons about moral courage. The novel \
explores themes of prejudice, justice, and the loss of innocence through a child's eyes.",
    ),
    (
        "The Lord of the Rings",
        "J.R.R. Tolkien's epic fantasy follows Frodo Baggins on his quest to destroy the One Ring \
and defeat the Dark Lord Sauron. Accompanied by a fellowship of diverse companions, \
they journey through Middle-earth facing incredible dangers. This masterwork explores \
themes of friendship, sacrifice, good versus evil, and the corrupting nature of power.",
    ),
    (
        "Pride and Prejudice",
        "Jane Austen's beloved novel follows Elizabeth Bennet as she navigates 19th-century \
English society, dealing with issues of marriage, money, and social class. Her relationship \
with the proud Mr. Darcy evolves from initial dislike to deep love. The story brilliantly \
examines themes of love, social expectations, and personal growth.",
    ),
    (
        "The Catcher in the Rye",
        "J.D. Salinger's controversial novel follows Holden Caulfield, a troubled teenager who \
wanders through New York City after being expelled from prep school. Through his cynical \
observations, the novel explores themes of alienation, depression, and the difficulty \
of growing up in a world he perceives as fake and superficial.",
    ),
    (
        "Brave New World",
        "Aldous Huxley's dystopian masterpiece depicts a futuristic society where humans are \
genetically engineered and conditioned for specific roles. The story follows Bernard Marx \
and John 'the Savage' as they challenge their controlled world. The novel examines themes \
of technology, social control, individual freedom, and what it means to be human.",
    ),
    (
        "The Great Gatsby",
        "F. Scott Fitzgerald's Jazz Age classic tells the story of Jay Gatsby's obsessive pursuit \
of his lost love, Daisy Buchanan. Through narrator Nick Carraway's eyes, we witness the \
decadence and moral emptiness of the wealthy elite. The novel explores themes of the \
American Dream, wealth, love, and social class in 1920s America.",
    ),
    (
        "Harry Potter and the Philosopher's Stone",
        "J.K. Rowling's magical tale begins when Harry Potter discovers he's a wizard on his 11th \
birthday and enters Hogwarts School of Witchcraft and Wizardry. Along with friends Ron \
and Hermione, he faces challenges and discovers his connection to the dark wizard Voldemort. \
The story combines magic, friendship, courage, and the eternal battle between good and evil.",
    ),
    (
        "Dune",
        "Frank Herbert's science fiction epic set on the desert planet Arrakis follows Paul Atreides \
as he becomes embroiled in a struggle for control of spice melange, the most valuable \
substance in the universe. The novel explores complex themes of politics, religion, ecology, \
and human potential in an intricate interstellar society.",
    ),
    (
        "All Quiet on the Western Front",
        "Erich Maria Remarque's powerful anti-war novel follows Paul Bäumer, a German soldier \
during World War I, as he experiences the brutal realities of trench warfare. The story \
depicts the physical and psychological trauma of war, the loss of innocence, and the \
profound disconnect between soldiers and civilian life.",
    ),
    (
        "The Chronicles of Narnia: The Lion, the Witch and the Wardrobe",
        "C.S. Lewis's fantasy classic follows four children who discover the magical land of Narnia \
through a wardrobe. They become involved in the struggle between the noble lion Aslan and \
the evil White Witch. The story combines fantasy adventure with deeper themes of sacrifice, \
redemption, and the eternal battle between good and evil.",
    ),
];

/// Curated long-form summaries, looked up by exact title.
#[derive(Debug, Clone)]
pub struct DetailTable {
    entries: HashMap<String, String>,
}

impl DetailTable {
    pub fn builtin() -> Self {
        Self::from_entries(
            CURATED_SUMMARIES
                .iter()
                .map(|(title, summary)| ((*title).to_owned(), (*summary).to_owned())),
        )
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Never fails: an unknown title yields a message the model can relay.
    pub fn detailed_summary(&self, title: &str) -> String {
        match self.entries.get(title) {
            Some(summary) => summary.clone(),
            None => not_found_message(title),
        }
    }

    pub fn contains(&self, title: &str) -> bool {
        self.entries.contains_key(title)
    }

}

pub fn not_found_message(title: &str) -> String {
    format!(
        "Sorry, I don't have a detailed summary for '{title}'. \
Please check the title spelling or try a different book."
    )
}

/// Tool declaration sent to the language model in round 1.
pub fn detail_tool_spec() -> ToolSpec {
    ToolSpec {
        name: DETAIL_TOOL_NAME.to_owned(),
        description: "Get a detailed summary for a specific book title".to_owned(),
        parameters: json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "The exact title of the book"
                }
            },
            "required": ["title"]
        }),
    }
}
